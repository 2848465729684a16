//! Command-line interface
//!
//! Command definitions, argument parsing and command execution for `kve`.

pub mod commands;

pub use commands::*;
