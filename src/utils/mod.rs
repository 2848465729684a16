//! Utility functions module
//!
//! Date parsing, output formatting, interactive prompts, HTTP client setup
//! and retry logic.

pub mod datetime;
pub mod format;
pub mod interactive;
pub mod network;
pub mod retry;

pub use format::*;
pub use network::*;
pub use retry::*;
