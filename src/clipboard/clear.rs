//! Deferred clipboard clearing
//!
//! A copy schedules a clear keyed by the checksum of what was copied. When
//! the timer fires the clipboard is only cleared if it still holds that
//! content, so a later unrelated copy survives.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clipboard::backend::ClipboardBackend;
use crate::error::{Result, VaultEditError};
use crate::item::checksum::calculate_checksum;

/// What a scheduled clear found when it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// Clipboard holds something else now
    Changed,
    Empty,
}

/// Clear the clipboard if its text still hashes to `expected_checksum`
pub fn clear_if_unchanged(
    backend: &mut dyn ClipboardBackend,
    expected_checksum: &str,
) -> Result<ClearOutcome> {
    let Some(text) = backend.get_text()? else {
        return Ok(ClearOutcome::Empty);
    };

    if calculate_checksum(&text).eq_ignore_ascii_case(expected_checksum) {
        backend.clear()?;
        info!("clipboard cleared");
        Ok(ClearOutcome::Cleared)
    } else {
        debug!("clipboard content changed since copy, leaving it alone");
        Ok(ClearOutcome::Changed)
    }
}

/// Wait `ttl`, then clear if unchanged
pub async fn clear_after(
    backend: &mut dyn ClipboardBackend,
    ttl: Duration,
    expected_checksum: &str,
) -> Result<ClearOutcome> {
    tokio::time::sleep(ttl).await;
    clear_if_unchanged(backend, expected_checksum)
}

/// Arranges for the clipboard to be cleared later
pub trait ClearScheduler {
    fn schedule(&self, ttl: Duration, checksum: &str) -> Result<()>;
}

/// Spawns a detached copy of this executable that clears the clipboard,
/// so the clear still happens after the CLI exits.
pub struct DetachedProcessScheduler {
    executable: PathBuf,
}

impl DetachedProcessScheduler {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    pub fn current() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    fn command(&self, ttl: Duration, checksum: &str) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args([
                "clipboard-clear",
                "--after",
                &ttl.as_secs().max(1).to_string(),
                "--checksum",
                checksum,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: not killed along with the terminal's foreground job
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        command
    }
}

impl ClearScheduler for DetachedProcessScheduler {
    fn schedule(&self, ttl: Duration, checksum: &str) -> Result<()> {
        let child = self.command(ttl, checksum).spawn().map_err(|e| {
            VaultEditError::clipboard(format!("failed to spawn clipboard clear process: {e}"))
        })?;
        debug!(
            "clipboard clear scheduled in {}s (pid {})",
            ttl.as_secs(),
            child.id()
        );
        Ok(())
    }
}

/// Factory for clipboard backends used by background clears
pub type BackendFactory =
    Arc<dyn Fn() -> Result<Box<dyn ClipboardBackend + Send>> + Send + Sync>;

/// Clears from a tokio task; for hosts that outlive the timer
pub struct TaskScheduler {
    factory: BackendFactory,
}

impl TaskScheduler {
    pub fn new(factory: BackendFactory) -> Self {
        Self { factory }
    }
}

impl ClearScheduler for TaskScheduler {
    fn schedule(&self, ttl: Duration, checksum: &str) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            VaultEditError::clipboard(format!("no async runtime to schedule clipboard clear: {e}"))
        })?;
        let factory = Arc::clone(&self.factory);
        let checksum = checksum.to_string();

        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            let outcome = factory().and_then(|mut backend| {
                clear_if_unchanged(backend.as_mut(), &checksum)
            });
            if let Err(e) = outcome {
                warn!("scheduled clipboard clear failed: {}", e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::backend::{ClipboardPayload, MemoryClipboard};

    #[test]
    fn test_clears_only_matching_content() {
        let mut clipboard = MemoryClipboard::new();
        clipboard
            .set(&ClipboardPayload::Text("secret".to_string()))
            .unwrap();

        let outcome = clear_if_unchanged(&mut clipboard, &calculate_checksum("other")).unwrap();
        assert_eq!(outcome, ClearOutcome::Changed);
        assert_eq!(clipboard.get_text().unwrap().as_deref(), Some("secret"));

        let outcome = clear_if_unchanged(&mut clipboard, &calculate_checksum("secret")).unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);
        assert_eq!(clipboard.get_text().unwrap(), None);

        let outcome = clear_if_unchanged(&mut clipboard, &calculate_checksum("secret")).unwrap();
        assert_eq!(outcome, ClearOutcome::Empty);
    }

    #[tokio::test]
    async fn test_clear_after_waits_for_ttl() {
        let mut clipboard = MemoryClipboard::new();
        clipboard
            .set(&ClipboardPayload::Text("secret".to_string()))
            .unwrap();

        let outcome = clear_after(
            &mut clipboard,
            Duration::from_millis(10),
            &calculate_checksum("secret"),
        )
        .await
        .unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);
    }

    #[tokio::test]
    async fn test_task_scheduler_last_write_wins() {
        let clipboard = MemoryClipboard::new();
        let shared = clipboard.clone();
        let scheduler = TaskScheduler::new(Arc::new(move || {
            Ok(Box::new(shared.clone()) as Box<dyn ClipboardBackend + Send>)
        }));

        let mut writer = clipboard.clone();
        writer
            .set(&ClipboardPayload::Text("first".to_string()))
            .unwrap();
        scheduler
            .schedule(Duration::from_millis(20), &calculate_checksum("first"))
            .unwrap();
        writer
            .set(&ClipboardPayload::Text("second".to_string()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            clipboard.payload(),
            Some(ClipboardPayload::Text("second".to_string()))
        );
    }

    #[test]
    fn test_task_scheduler_requires_runtime() {
        let scheduler = TaskScheduler::new(Arc::new(|| {
            Ok(Box::new(MemoryClipboard::new()) as Box<dyn ClipboardBackend + Send>)
        }));
        assert!(scheduler.schedule(Duration::from_secs(1), "abc").is_err());
    }

    #[test]
    fn test_detached_command_arguments() {
        let scheduler = DetachedProcessScheduler::new(PathBuf::from("/usr/local/bin/kve"));
        let command = scheduler.command(Duration::from_secs(45), "abc123");
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, ["clipboard-clear", "--after", "45", "--checksum", "abc123"]);
    }
}
