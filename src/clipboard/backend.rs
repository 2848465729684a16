//! Clipboard backends
//!
//! `SystemClipboard` talks to the OS clipboard through arboard.
//! `MemoryClipboard` keeps the payload in process memory for headless hosts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;
use url::Url;

use crate::error::Result;

/// Content placed on the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    Text(String),
    /// Files offered with a "move" drop effect
    FileDrop(Vec<PathBuf>),
}

impl ClipboardPayload {
    /// Text form of the payload; file drops render as a `file://` URI list
    pub fn text_representation(&self) -> String {
        match self {
            ClipboardPayload::Text(text) => text.clone(),
            ClipboardPayload::FileDrop(paths) => paths
                .iter()
                .map(|path| match Url::from_file_path(path) {
                    Ok(url) => url.to_string(),
                    Err(()) => path.display().to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

pub trait ClipboardBackend {
    fn set(&mut self, payload: &ClipboardPayload) -> Result<()>;

    /// Current clipboard text, `None` when the clipboard holds no text
    fn get_text(&mut self) -> Result<Option<String>>;

    fn clear(&mut self) -> Result<()>;
}

/// OS clipboard
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set(&mut self, payload: &ClipboardPayload) -> Result<()> {
        if let ClipboardPayload::FileDrop(paths) = payload {
            debug!("offering {} file(s) as a URI list", paths.len());
        }
        self.inner.set_text(payload.text_representation())?;
        Ok(())
    }

    fn get_text(&mut self) -> Result<Option<String>> {
        match self.inner.get_text() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear()?;
        Ok(())
    }
}

/// In-memory clipboard; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<ClipboardPayload>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> Option<ClipboardPayload> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ClipboardPayload>> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn set(&mut self, payload: &ClipboardPayload) -> Result<()> {
        *self.lock() = Some(payload.clone());
        Ok(())
    }

    fn get_text(&mut self) -> Result<Option<String>> {
        Ok(self.lock().as_ref().map(ClipboardPayload::text_representation))
    }

    fn clear(&mut self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
