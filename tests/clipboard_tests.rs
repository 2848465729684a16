//! Tests for clipboard functionality: arboard integration, checksum-keyed
//! clearing and the configurable timeout.
//!
//! NOTE: System clipboard tests must run single-threaded to avoid segfaults
//! from concurrent clipboard access:
//!   cargo test --test clipboard_tests -- --test-threads=1

use std::sync::Mutex;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tempfile::TempDir;

use vaultedit::clipboard::{
    clear_after, clear_if_unchanged, ClearOutcome, ClearScheduler, ClipboardBackend,
    ClipboardPayload, CopyOptions, MemoryClipboard, SystemClipboard,
};
use vaultedit::config::Config;
use vaultedit::item::{calculate_checksum, SecretKindRegistry};
use vaultedit::{ContentType, Result, VaultItem};

#[derive(Default)]
struct RecordingScheduler {
    scheduled: Mutex<Vec<(Duration, String)>>,
}

impl ClearScheduler for RecordingScheduler {
    fn schedule(&self, ttl: Duration, checksum: &str) -> Result<()> {
        self.scheduled
            .lock()
            .unwrap()
            .push((ttl, checksum.to_string()));
        Ok(())
    }
}

fn secret(value: &str, content_type: ContentType) -> VaultItem {
    let mut item = VaultItem::new_secret(
        "contoso",
        "api-key",
        SecretKindRegistry::builtin().default_kind(),
        content_type,
    );
    item.set_value(value);
    item
}

// ─── arboard basic read/write ───────────────────────────────────────────────

#[test]
fn test_system_clipboard_set_and_clear() {
    let mut clipboard = match SystemClipboard::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Skipping clipboard test (no display?): {e}");
            return;
        }
    };

    let sentinel = format!("kve-test-{}", std::process::id());
    if clipboard
        .set(&ClipboardPayload::Text(sentinel.clone()))
        .is_err()
    {
        eprintln!("Skipping clipboard test (clipboard not writable)");
        return;
    }
    assert_eq!(clipboard.get_text().unwrap(), Some(sentinel.clone()));

    let outcome = clear_if_unchanged(&mut clipboard, &calculate_checksum(&sentinel)).unwrap();
    assert_eq!(outcome, ClearOutcome::Cleared);
    assert_eq!(clipboard.get_text().unwrap(), None);
}

// ─── Copy and scheduled clear ───────────────────────────────────────────────

#[test]
fn test_copy_secret_schedules_clear_with_checksum() {
    let mut clipboard = MemoryClipboard::new();
    let scheduler = RecordingScheduler::default();
    let options = CopyOptions {
        ttl: Duration::from_secs(45),
        ..CopyOptions::default()
    };

    let message = secret("s3cret", ContentType::None)
        .copy_to_clipboard(&mut clipboard, &scheduler, &options, true)
        .unwrap();

    assert_eq!(message.as_deref(), Some("Secret api-key copied to clipboard"));
    assert_eq!(
        clipboard.payload(),
        Some(ClipboardPayload::Text("s3cret".to_string()))
    );
    assert_eq!(
        *scheduler.scheduled.lock().unwrap(),
        vec![(Duration::from_secs(45), calculate_checksum("s3cret"))]
    );
}

#[test]
fn test_zero_ttl_keeps_clipboard() {
    let mut clipboard = MemoryClipboard::new();
    let scheduler = RecordingScheduler::default();
    let options = CopyOptions {
        ttl: Duration::ZERO,
        ..CopyOptions::default()
    };

    let message = secret("s3cret", ContentType::None)
        .copy_to_clipboard(&mut clipboard, &scheduler, &options, false)
        .unwrap();

    assert!(message.is_none());
    assert!(clipboard.payload().is_some());
    assert!(scheduler.scheduled.lock().unwrap().is_empty());
}

#[test]
fn test_certificate_is_offered_as_file_drop() {
    let dir = TempDir::new().unwrap();
    let mut clipboard = MemoryClipboard::new();
    let scheduler = RecordingScheduler::default();
    let options = CopyOptions {
        ttl: Duration::from_secs(30),
        temp_dir: dir.path().to_path_buf(),
    };

    let item = secret("MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA", ContentType::Pkcs12);
    let message = item
        .copy_to_clipboard(&mut clipboard, &scheduler, &options, true)
        .unwrap();

    let expected = dir.path().join(item.file_name());
    assert_eq!(
        clipboard.payload(),
        Some(ClipboardPayload::FileDrop(vec![expected.clone()]))
    );
    assert_eq!(
        message.as_deref(),
        Some("Certificate api-key copied to clipboard")
    );

    // The dropped file is exactly what an export of the same item writes
    let exported = dir.path().join("exported.pfx");
    item.save_to_file(&exported).unwrap();
    let dropped = std::fs::read(&expected).unwrap();
    assert_eq!(dropped, std::fs::read(&exported).unwrap());
    assert_eq!(
        dropped,
        STANDARD.decode(item.raw_value()).unwrap(),
        "a certificate file holds the decoded bytes"
    );
}

#[cfg(unix)]
#[test]
fn test_certificate_file_drop_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let mut clipboard = MemoryClipboard::new();
    let scheduler = RecordingScheduler::default();
    let options = CopyOptions {
        ttl: Duration::from_secs(30),
        temp_dir: dir.path().to_path_buf(),
    };

    let item = secret("MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA", ContentType::Pkcs12);
    item.copy_to_clipboard(&mut clipboard, &scheduler, &options, false)
        .unwrap();

    let path = dir.path().join(item.file_name());
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o077, 0, "certificate file must not be readable by others");
}

#[tokio::test]
async fn test_clear_after_leaves_newer_content_alone() {
    let mut clipboard = MemoryClipboard::new();
    let mut observer = clipboard.clone();

    clipboard
        .set(&ClipboardPayload::Text("copied by kve".to_string()))
        .unwrap();
    observer
        .set(&ClipboardPayload::Text("copied by someone else".to_string()))
        .unwrap();

    let outcome = clear_after(
        &mut clipboard,
        Duration::from_millis(10),
        &calculate_checksum("copied by kve"),
    )
    .await
    .unwrap();

    assert_eq!(outcome, ClearOutcome::Changed);
    assert_eq!(
        observer.get_text().unwrap().as_deref(),
        Some("copied by someone else")
    );
}

#[tokio::test]
async fn test_clear_after_on_empty_clipboard() {
    let mut clipboard = MemoryClipboard::new();
    let outcome = clear_after(&mut clipboard, Duration::from_millis(1), "abc")
        .await
        .unwrap();
    assert_eq!(outcome, ClearOutcome::Empty);
}

// ─── Config: clipboard_timeout ──────────────────────────────────────────────

#[test]
fn test_config_default_clipboard_timeout() {
    let config = Config::default();
    assert_eq!(
        config.clipboard_timeout, 30,
        "default clipboard_timeout should be 30 seconds"
    );
    assert_eq!(config.clipboard_ttl(), Duration::from_secs(30));
}

#[test]
fn test_config_clipboard_timeout_deserialization() {
    let config: Config = toml::from_str("default_vault = \"contoso\"\n")
        .expect("should deserialize without clipboard_timeout field");
    assert_eq!(config.clipboard_timeout, 30);

    let config: Config = toml::from_str("clipboard_timeout = 0\n")
        .expect("should deserialize with clipboard_timeout=0");
    assert_eq!(config.clipboard_timeout, 0, "0 should be valid (means disabled)");
}
