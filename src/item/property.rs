//! Editable vault item
//!
//! [`VaultItem`] binds the fields of one secret, certificate or key to an
//! editable form. Every mutation publishes a [`PropertyChange`] so that
//! front-ends can mark the item dirty; the raw vault value, its checksum and
//! the persisted tag map are always derived from the current field values.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::clipboard::{ClearScheduler, ClipboardBackend, ClipboardPayload, CopyOptions};
use crate::error::Result;
use crate::item::checksum::calculate_checksum;
use crate::item::content_type::ContentType;
use crate::item::export;
use crate::item::identifier::ItemIdentifier;
use crate::item::kind::ItemKind;
use crate::item::notify::{ChangeListener, ChangeNotifier, PropertyChange, SubscriptionId};
use crate::item::secret_kind::{SecretKind, SecretKindRegistry};
use crate::item::tags::{TagCollection, TagItem, CHECKSUM_TAG_KEY, SECRET_KIND_TAG_KEY};
use crate::vault::{SetItemRequest, VaultItemRecord};

/// Result of comparing the stored checksum tag with the current value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    Match,
    Mismatch { stored: String, computed: String },
    Missing,
}

impl fmt::Display for ChecksumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumStatus::Match => f.write_str("match"),
            ChecksumStatus::Mismatch { stored, computed } => {
                write!(f, "mismatch (stored {stored}, computed {computed})")
            }
            ChecksumStatus::Missing => f.write_str("missing"),
        }
    }
}

pub struct VaultItem {
    identifier: ItemIdentifier,
    name: Option<String>,
    tags: TagCollection,
    enabled: Option<bool>,
    expires: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    /// Human-readable value
    value: Option<String>,
    content_type: ContentType,
    secret_kind: SecretKind,
    /// Reserved tags as they were stored in the vault
    stored_tags: HashMap<String, String>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    notifier: ChangeNotifier,
    clean_revision: u64,
}

impl VaultItem {
    /// Build an item from its identifier and attributes.
    ///
    /// Timestamps are accepted as given. The optional listener is subscribed
    /// to both the item and its tag collection.
    pub fn new(
        identifier: ItemIdentifier,
        tags: &HashMap<String, String>,
        enabled: Option<bool>,
        expires: Option<DateTime<Utc>>,
        not_before: Option<DateTime<Utc>>,
        listener: Option<ChangeListener>,
    ) -> Self {
        let notifier = ChangeNotifier::new();
        let (tags, stored_tags) = TagCollection::from_map(tags, notifier.clone());
        if let Some(listener) = listener {
            notifier.subscribe(listener);
        }

        let name = Some(identifier.name.clone()).filter(|name| !name.is_empty());
        let content_type = identifier.kind.default_content_type();

        Self {
            identifier,
            name,
            tags,
            enabled,
            expires,
            not_before,
            value: None,
            content_type,
            secret_kind: SecretKind::default(),
            stored_tags,
            created: None,
            updated: None,
            notifier,
            clean_revision: 0,
        }
    }

    /// Start a new secret, pre-filled with the kind's value template
    pub fn new_secret(
        vault_name: &str,
        name: &str,
        secret_kind: SecretKind,
        content_type: ContentType,
    ) -> Self {
        let identifier = ItemIdentifier::new(vault_name, ItemKind::Secret, name);
        let mut item = Self::new(identifier, &HashMap::new(), Some(true), None, None, None);
        if !secret_kind.value_template().is_empty() {
            item.value = Some(secret_kind.value_template().to_string());
        }
        item.secret_kind = secret_kind;
        item.content_type = content_type;
        item
    }

    /// Build an item from a backend record, decoding its raw value
    pub fn from_record(record: &VaultItemRecord, registry: &SecretKindRegistry) -> Self {
        let mut item = Self::new(
            record.identifier.clone(),
            &record.tags,
            record.enabled,
            record.expires,
            record.not_before,
            None,
        );

        let mut content_type = match record.content_type.as_deref() {
            Some(mime) => ContentType::parse(Some(mime)),
            None => record.identifier.kind.default_content_type(),
        };

        item.value = match record.value.as_deref() {
            Some(raw) => match content_type.from_raw_value(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(
                        "could not decode '{}' as {}: {}; keeping raw value",
                        record.identifier.name, content_type, e
                    );
                    content_type = ContentType::None;
                    Some(raw.to_string())
                }
            },
            None => None,
        };
        item.content_type = content_type;
        item.secret_kind =
            registry.resolve(item.stored_tags.get(SECRET_KIND_TAG_KEY).map(String::as_str));
        item.created = record.created;
        item.updated = record.updated;
        item
    }

    pub fn identifier(&self) -> &ItemIdentifier {
        &self.identifier
    }

    pub fn kind(&self) -> ItemKind {
        self.identifier.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        let name = Some(name.into());
        if self.name != name {
            self.name = name;
            self.notifier.notify(PropertyChange::Name);
        }
    }

    pub fn tags(&self) -> &TagCollection {
        &self.tags
    }

    /// Mutable tags; changes are published on this item's notifier
    pub fn tags_mut(&mut self) -> &mut TagCollection {
        &mut self.tags
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: Option<bool>) {
        self.enabled = enabled;
        self.notifier.notify(PropertyChange::Enabled);
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn set_expires(&mut self, expires: Option<DateTime<Utc>>) {
        self.expires = expires;
        self.notifier.notify(PropertyChange::Expires);
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    pub fn set_not_before(&mut self, not_before: Option<DateTime<Utc>>) {
        self.not_before = not_before;
        self.notifier.notify(PropertyChange::NotBefore);
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Replace the human-readable value; notifies only on change
    pub fn set_value<S: Into<String>>(&mut self, value: S) {
        let value = value.into();
        if self.value.as_deref() == Some(value.as_str()) {
            return;
        }
        if let Some(old) = self.value.as_mut() {
            old.zeroize();
        }
        self.value = Some(value);
        self.notifier.notify(PropertyChange::Value);
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Change how the value is encoded. Does not notify.
    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn secret_kind(&self) -> &SecretKind {
        &self.secret_kind
    }

    /// Reclassify the item. Does not notify.
    pub fn set_secret_kind(&mut self, secret_kind: SecretKind) {
        self.secret_kind = secret_kind;
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Reserved tag value as loaded from the vault
    pub fn stored_tag(&self, key: &str) -> Option<&str> {
        self.stored_tags.get(key).map(String::as_str)
    }

    pub fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Whether any change was published since construction or `mark_clean`
    pub fn is_dirty(&self) -> bool {
        self.notifier.revision() != self.clean_revision
    }

    pub fn mark_clean(&mut self) {
        self.clean_revision = self.notifier.revision();
    }

    /// Take over identity and server-side metadata from a stored record.
    ///
    /// Values and user tags are left alone and nothing is published.
    pub fn apply_saved(&mut self, record: &VaultItemRecord) {
        self.identifier = record.identifier.clone();
        self.name = Some(record.identifier.name.clone());
        self.stored_tags = record.tags.clone();
        self.created = record.created;
        self.updated = record.updated;
    }

    /// Exact value stored in the vault
    pub fn raw_value(&self) -> String {
        self.content_type
            .to_raw_value(self.value.as_deref().unwrap_or_default())
    }

    /// Checksum of the raw value
    pub fn checksum(&self) -> String {
        calculate_checksum(&self.raw_value())
    }

    pub fn checksum_status(&self) -> ChecksumStatus {
        match self.stored_tags.get(CHECKSUM_TAG_KEY) {
            None => ChecksumStatus::Missing,
            Some(stored) => {
                let computed = self.checksum();
                if stored.eq_ignore_ascii_case(&computed) {
                    ChecksumStatus::Match
                } else {
                    ChecksumStatus::Mismatch {
                        stored: stored.clone(),
                        computed,
                    }
                }
            }
        }
    }

    /// Tags contributed by the item kind
    pub fn custom_tags(&self) -> Vec<TagItem> {
        self.kind()
            .computed_tags(&self.secret_kind, &self.raw_value())
    }

    /// Tag map to persist: user tags, then computed tags, then the checksum
    pub fn to_tags(&self) -> HashMap<String, String> {
        let mut result = self.tags.to_map();
        for tag in self.custom_tags() {
            result.insert(tag.name, tag.value);
        }
        result.insert(CHECKSUM_TAG_KEY.to_string(), self.checksum());
        result
    }

    pub fn is_name_valid(&self) -> bool {
        self.secret_kind.is_name_valid(self.name.as_deref())
    }

    pub fn is_value_valid(&self) -> bool {
        self.secret_kind.is_value_valid(self.value.as_deref())
    }

    /// Name plus the content type's extension
    pub fn file_name(&self) -> String {
        format!(
            "{}{}",
            self.name.as_deref().unwrap_or_default(),
            self.content_type.extension()
        )
    }

    pub fn key_vault_file_extension(&self) -> &'static str {
        self.kind().key_vault_file_extension()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        export::save_to_file(self, path)
    }

    /// Clipboard payload for this item.
    ///
    /// Certificates are written to `temp_dir` and offered as a file drop;
    /// everything else is copied as text.
    pub fn clipboard_value(&self, temp_dir: &Path) -> Result<Option<ClipboardPayload>> {
        if self.content_type.is_certificate() {
            let path = temp_dir.join(self.file_name());
            self.save_to_file(&path)?;
            debug!("certificate written to {} for clipboard", path.display());
            return Ok(Some(ClipboardPayload::FileDrop(vec![path])));
        }
        Ok(self.value.clone().map(ClipboardPayload::Text))
    }

    /// Copy the item to the clipboard and schedule its removal.
    ///
    /// Returns the notification text when `show_notification` is set.
    pub fn copy_to_clipboard(
        &self,
        clipboard: &mut dyn ClipboardBackend,
        scheduler: &dyn ClearScheduler,
        options: &CopyOptions,
        show_notification: bool,
    ) -> Result<Option<String>> {
        let Some(payload) = self.clipboard_value(&options.temp_dir)? else {
            debug!("nothing to copy for {}", self.identifier);
            return Ok(None);
        };

        clipboard.set(&payload)?;
        if !options.ttl.is_zero() {
            let checksum = calculate_checksum(&payload.text_representation());
            scheduler.schedule(options.ttl, &checksum)?;
        }
        info!("{} copied to clipboard", self.identifier);

        if !show_notification {
            return Ok(None);
        }
        let label = if self.content_type.is_certificate() {
            "Certificate"
        } else {
            "Secret"
        };
        Ok(Some(format!(
            "{} {} copied to clipboard",
            label,
            self.name.as_deref().unwrap_or_default()
        )))
    }

    /// Windows Internet Shortcut linking to the item in the portal
    pub fn link_as_internet_shortcut(&self) -> String {
        format!("[InternetShortcut]\nURL={}", self.identifier.vault_link())
    }

    /// Update request carrying the current state, with tags recomputed
    pub fn to_set_request(&self) -> SetItemRequest {
        let mut identifier = self.identifier.clone();
        identifier.version = None;
        if let Some(name) = &self.name {
            identifier.name = name.clone();
        }

        SetItemRequest {
            identifier,
            value: match self.kind() {
                ItemKind::Secret => Some(self.raw_value()),
                ItemKind::Certificate | ItemKind::Key => None,
            },
            content_type: self.content_type.mime().map(str::to_string),
            tags: self.to_tags(),
            enabled: self.enabled,
            expires: self.expires,
            not_before: self.not_before,
        }
    }
}

impl Drop for VaultItem {
    fn drop(&mut self) {
        if let Some(value) = self.value.as_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for VaultItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultItem")
            .field("identifier", &self.identifier.identifier())
            .field("name", &self.name)
            .field("tags", &self.tags.len())
            .field("enabled", &self.enabled)
            .field("expires", &self.expires)
            .field("not_before", &self.not_before)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .field("content_type", &self.content_type)
            .field("secret_kind", &self.secret_kind.alias())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClearScheduler, MemoryClipboard};
    use crate::item::tags::THUMBPRINT_TAG_KEY;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

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

    fn secret(name: &str, tags: &[(&str, &str)]) -> VaultItem {
        let tags: HashMap<String, String> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VaultItem::new(
            ItemIdentifier::new("contoso", ItemKind::Secret, name),
            &tags,
            Some(true),
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_construction_does_not_mark_dirty() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut tags = HashMap::new();
        tags.insert("env".to_string(), "prod".to_string());

        let item = VaultItem::new(
            ItemIdentifier::new("contoso", ItemKind::Secret, "api-key"),
            &tags,
            None,
            None,
            None,
            Some(Arc::new(move |change: &PropertyChange| {
                sink.lock().unwrap().push(change.clone());
            })),
        );

        assert!(!item.is_dirty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(item.name(), Some("api-key"));
        assert_eq!(item.content_type(), ContentType::None);
        assert!(item.secret_kind().is_default());
    }

    #[test]
    fn test_listener_sees_field_and_tag_edits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut item = secret("api-key", &[]);
        item.subscribe(Arc::new(move |change: &PropertyChange| {
            sink.lock().unwrap().push(change.property_name());
        }));

        item.set_enabled(Some(false));
        item.set_expires(Some(Utc::now()));
        item.set_not_before(None);
        item.set_value("s3cret");
        item.set_value("s3cret");
        item.tags_mut().set("owner", "ops").unwrap();
        item.set_content_type(ContentType::Base64);
        item.set_secret_kind(SecretKind::default());

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Enabled", "Expires", "NotBefore", "Value", "Tags"]
        );
        assert!(item.is_dirty());
        item.mark_clean();
        assert!(!item.is_dirty());
    }

    #[test]
    fn test_checksum_tag_always_wins() {
        let mut item = secret("api-key", &[(CHECKSUM_TAG_KEY, "forged"), ("env", "dev")]);
        item.set_value("hello");

        let tags = item.to_tags();
        assert_eq!(tags.get(CHECKSUM_TAG_KEY), Some(&calculate_checksum("hello")));
        assert_eq!(tags.get("env").map(String::as_str), Some("dev"));
        assert_eq!(item.stored_tag(CHECKSUM_TAG_KEY), Some("forged"));
    }

    #[test]
    fn test_computed_tags_override_user_tags() {
        let registry = SecretKindRegistry::builtin();
        let mut item = secret("db-password", &[]);
        item.set_secret_kind(registry.get("Password").unwrap().clone());

        let tags = item.to_tags();
        assert_eq!(tags.get(SECRET_KIND_TAG_KEY).map(String::as_str), Some("Password"));
    }

    #[test]
    fn test_raw_value_and_checksum_follow_content_type() {
        let mut item = secret("blob", &[]);
        item.set_value("hello");
        let plain = item.checksum();

        item.set_content_type(ContentType::Base64);
        assert_eq!(item.raw_value(), "aGVsbG8=");
        assert_eq!(item.checksum(), calculate_checksum("aGVsbG8="));
        assert_ne!(item.checksum(), plain);
    }

    #[test]
    fn test_validity_predicates() {
        let mut item = secret("api-key", &[]);
        assert!(item.is_name_valid());
        assert!(!item.is_value_valid());

        item.set_value("anything");
        assert!(item.is_value_valid());

        item.set_name("bad name!");
        assert!(!item.is_name_valid());

        let unnamed = VaultItem::new(
            ItemIdentifier::new("contoso", ItemKind::Secret, ""),
            &HashMap::new(),
            None,
            None,
            None,
            None,
        );
        assert_eq!(unnamed.name(), None);
        assert!(!unnamed.is_name_valid());
    }

    #[test]
    fn test_file_name_uses_content_type_extension() {
        let mut item = secret("settings", &[]);
        assert_eq!(item.file_name(), "settings.txt");
        item.set_content_type(ContentType::JsonGzBase64);
        assert_eq!(item.file_name(), "settings.json.gz");
        assert_eq!(item.key_vault_file_extension(), ".kv-secret");
    }

    #[test]
    fn test_from_record_decodes_value_and_resolves_kind() {
        let registry = SecretKindRegistry::builtin();
        let mut tags = HashMap::new();
        tags.insert(SECRET_KIND_TAG_KEY.to_string(), "Password".to_string());
        tags.insert(CHECKSUM_TAG_KEY.to_string(), calculate_checksum("aGVsbG8="));
        let record = VaultItemRecord {
            identifier: ItemIdentifier::new("contoso", ItemKind::Secret, "pw").with_version("v1"),
            value: Some("aGVsbG8=".to_string()),
            content_type: Some("application/x-base64".to_string()),
            tags,
            enabled: Some(true),
            ..Default::default()
        };

        let item = VaultItem::from_record(&record, &registry);
        assert_eq!(item.value(), Some("hello"));
        assert_eq!(item.secret_kind().alias(), "Password");
        assert_eq!(item.checksum_status(), ChecksumStatus::Match);
        assert!(item.tags().is_empty());
        assert!(!item.is_dirty());
    }

    #[test]
    fn test_from_record_keeps_undecodable_raw_value() {
        let record = VaultItemRecord {
            identifier: ItemIdentifier::new("contoso", ItemKind::Secret, "blob"),
            value: Some("@@not-base64@@".to_string()),
            content_type: Some("application/x-base64".to_string()),
            ..Default::default()
        };

        let item = VaultItem::from_record(&record, &SecretKindRegistry::builtin());
        assert_eq!(item.content_type(), ContentType::None);
        assert_eq!(item.raw_value(), "@@not-base64@@");
        assert_eq!(item.checksum_status(), ChecksumStatus::Missing);
    }

    #[test]
    fn test_checksum_tag_is_found_regardless_of_key_case() {
        let checksum = calculate_checksum("v");
        let mut item = secret("api-key", &[("sha256", checksum.as_str())]);
        item.set_value("v");

        assert!(item.tags().is_empty());
        assert_eq!(item.checksum_status(), ChecksumStatus::Match);
    }

    #[test]
    fn test_checksum_mismatch_reports_both_values() {
        let mut item = secret("api-key", &[(CHECKSUM_TAG_KEY, "deadbeef")]);
        item.set_value("v");
        match item.checksum_status() {
            ChecksumStatus::Mismatch { stored, computed } => {
                assert_eq!(stored, "deadbeef");
                assert_eq!(computed, calculate_checksum("v"));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_copy_text_schedules_checksum_keyed_clear() {
        let mut item = secret("api-key", &[]);
        item.set_value("s3cret");
        let mut clipboard = MemoryClipboard::new();
        let scheduler = RecordingScheduler::default();
        let options = CopyOptions {
            ttl: Duration::from_secs(30),
            temp_dir: std::env::temp_dir(),
        };

        let message = item
            .copy_to_clipboard(&mut clipboard, &scheduler, &options, true)
            .unwrap();

        assert_eq!(message.as_deref(), Some("Secret api-key copied to clipboard"));
        assert_eq!(clipboard.get_text().unwrap().as_deref(), Some("s3cret"));
        assert_eq!(
            *scheduler.scheduled.lock().unwrap(),
            vec![(Duration::from_secs(30), calculate_checksum("s3cret"))]
        );
    }

    #[test]
    fn test_copy_with_zero_ttl_does_not_schedule() {
        let mut item = secret("api-key", &[]);
        item.set_value("s3cret");
        let mut clipboard = MemoryClipboard::new();
        let scheduler = RecordingScheduler::default();
        let options = CopyOptions {
            ttl: Duration::ZERO,
            temp_dir: std::env::temp_dir(),
        };

        let message = item
            .copy_to_clipboard(&mut clipboard, &scheduler, &options, false)
            .unwrap();

        assert!(message.is_none());
        assert!(scheduler.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn test_copy_without_value_is_a_noop() {
        let item = secret("empty", &[]);
        let mut clipboard = MemoryClipboard::new();
        let scheduler = RecordingScheduler::default();

        let message = item
            .copy_to_clipboard(&mut clipboard, &scheduler, &CopyOptions::default(), true)
            .unwrap();

        assert!(message.is_none());
        assert_eq!(clipboard.get_text().unwrap(), None);
    }

    #[test]
    fn test_certificate_computes_thumbprint_and_skips_value_in_request() {
        let mut item = VaultItem::new(
            ItemIdentifier::new("contoso", ItemKind::Certificate, "web-tls").with_version("v2"),
            &HashMap::new(),
            Some(true),
            None,
            None,
            None,
        );
        item.set_value("AQID");

        let request = item.to_set_request();
        assert!(request.value.is_none());
        assert!(request.identifier.version.is_none());
        assert!(request.tags.contains_key(THUMBPRINT_TAG_KEY));
        assert_eq!(request.content_type.as_deref(), Some("application/pkix-cert"));
    }

    #[test]
    fn test_internet_shortcut_format() {
        let item = secret("api-key", &[]);
        assert_eq!(
            item.link_as_internet_shortcut(),
            "[InternetShortcut]\nURL=https://portal.azure.com/#asset/Microsoft_Azure_KeyVault/Secret/https://contoso.vault.azure.net/secrets/api-key"
        );
    }

    #[test]
    fn test_debug_redacts_value() {
        let mut item = secret("api-key", &[]);
        item.set_value("s3cret");
        let debug = format!("{item:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }
}
