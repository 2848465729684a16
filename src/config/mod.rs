//! Configuration management module
//!
//! Settings come from the config file, environment variables and
//! command-line flags, in increasing order of precedence.

pub mod init;
pub mod settings;

pub use settings::*;
