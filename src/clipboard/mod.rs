//! Clipboard integration
//!
//! Copying an item places its value (or, for certificates, a temporary file)
//! on the clipboard and schedules a checksum-keyed clear.

pub mod backend;
pub mod clear;

pub use backend::*;
pub use clear::*;

use std::path::PathBuf;
use std::time::Duration;

/// Default time a copied value stays on the clipboard
pub const DEFAULT_CLIPBOARD_TTL: Duration = Duration::from_secs(30);

/// Options for [`VaultItem::copy_to_clipboard`](crate::item::VaultItem::copy_to_clipboard)
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Zero disables the automatic clear
    pub ttl: Duration,
    /// Where certificate files are written for file-drop copies
    pub temp_dir: PathBuf,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CLIPBOARD_TTL,
            temp_dir: std::env::temp_dir(),
        }
    }
}
