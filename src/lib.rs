//! vaultedit - Azure Key Vault item editor
//!
//! Library and CLI for browsing and editing Azure Key Vault secrets,
//! certificates and keys through an editable, change-observable item model.

pub mod auth;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod item;
pub mod utils;
pub mod vault;

// Re-export commonly used types
pub use error::{Result, VaultEditError};
pub use item::{ContentType, ItemIdentifier, ItemKind, VaultItem};

/// Build-time information generated by `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
