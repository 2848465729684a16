//! Item service
//!
//! Loads vault records into editable items and persists them back after
//! checking the item against its secret kind.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, VaultEditError};
use crate::item::tags::MAX_TAG_COUNT;
use crate::item::{ChecksumStatus, ItemIdentifier, ItemKind, SecretKindRegistry, VaultItem};
use crate::vault::backend::{ItemSummary, VaultBackend};

pub struct ItemService<B: VaultBackend> {
    backend: B,
    registry: Arc<SecretKindRegistry>,
}

impl<B: VaultBackend> ItemService<B> {
    pub fn new(backend: B, registry: Arc<SecretKindRegistry>) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &SecretKindRegistry {
        &self.registry
    }

    pub async fn load(&self, identifier: &ItemIdentifier) -> Result<VaultItem> {
        let record = self.backend.get_item(identifier).await?;
        let item = VaultItem::from_record(&record, &self.registry);
        if let ChecksumStatus::Mismatch { .. } = item.checksum_status() {
            warn!("{} was changed outside of this tool", item.identifier());
        }
        Ok(item)
    }

    pub async fn list(&self, vault_name: &str, kind: ItemKind) -> Result<Vec<ItemSummary>> {
        self.backend.list_items(vault_name, kind).await
    }

    /// Check an item can be persisted
    pub fn validate(&self, item: &VaultItem) -> Result<()> {
        if !item.is_name_valid() {
            return Err(VaultEditError::invalid_item_name(
                item.name().unwrap_or_default(),
            ));
        }

        if item.kind() == ItemKind::Secret && !item.is_value_valid() {
            return Err(VaultEditError::invalid_item_value(format!(
                "value does not match the {} secret kind",
                item.secret_kind().alias()
            )));
        }

        let missing = item
            .secret_kind()
            .missing_required_tags(&item.tags().to_map());
        if !missing.is_empty() {
            return Err(VaultEditError::MissingRequiredTags { names: missing });
        }

        // Computed and checksum tags count against the vault's limit too
        let tag_count = item.to_tags().len();
        if tag_count > MAX_TAG_COUNT {
            return Err(VaultEditError::invalid_tag(format!(
                "{} tags would be stored but a vault item holds at most {}; remove {} user tag(s)",
                tag_count,
                MAX_TAG_COUNT,
                tag_count - MAX_TAG_COUNT
            )));
        }

        if !item
            .secret_kind()
            .is_expiration_allowed(item.not_before(), item.expires())
        {
            let message = match item.secret_kind().max_expiration_days() {
                Some(days) => format!(
                    "{} secrets must expire within {} days of becoming valid",
                    item.secret_kind().alias(),
                    days
                ),
                None => "expiration must not precede the not-before date".to_string(),
            };
            return Err(VaultEditError::invalid_item_value(message));
        }

        if let Some(expires) = item.expires() {
            if expires < Utc::now() {
                warn!("{} is saved with an expiration in the past", item.identifier());
            }
        }

        Ok(())
    }

    /// Persist the item and adopt the stored state
    pub async fn save(&self, item: &mut VaultItem) -> Result<()> {
        self.validate(item)?;

        let request = item.to_set_request();
        let record = self.backend.set_item(&request).await?;
        info!("{} saved", record.identifier);

        item.apply_saved(&record);
        item.mark_clean();
        Ok(())
    }

    pub async fn delete(&self, identifier: &ItemIdentifier) -> Result<()> {
        self.backend.delete_item(identifier).await
    }

    /// Load the item and compare its stored checksum tag to its value
    pub async fn verify(&self, identifier: &ItemIdentifier) -> Result<ChecksumStatus> {
        Ok(self.load(identifier).await?.checksum_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{calculate_checksum, CHECKSUM_TAG_KEY};
    use crate::vault::backend::{MockVaultBackend, VaultItemRecord};
    use chrono::Duration;
    use mockall::predicate::always;
    use std::collections::HashMap;

    fn service(backend: MockVaultBackend) -> ItemService<MockVaultBackend> {
        ItemService::new(backend, Arc::new(SecretKindRegistry::builtin()))
    }

    fn secret_record(value: &str, tags: HashMap<String, String>) -> VaultItemRecord {
        VaultItemRecord {
            identifier: ItemIdentifier::new("contoso", ItemKind::Secret, "db").with_version("v1"),
            value: Some(value.to_string()),
            content_type: Some("text/plain".to_string()),
            tags,
            enabled: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_sends_checksum_tag_and_marks_clean() {
        let mut backend = MockVaultBackend::new();
        backend
            .expect_set_item()
            .withf(|request| {
                request.identifier.version.is_none()
                    && request.value.as_deref() == Some("s3cret")
                    && request.tags.get(CHECKSUM_TAG_KEY) == Some(&calculate_checksum("s3cret"))
            })
            .times(1)
            .returning(|request| {
                let mut record = secret_record("s3cret", request.tags.clone());
                record.identifier = request.identifier.clone().with_version("v2");
                Ok(record)
            });
        let service = service(backend);

        let mut item = VaultItem::new_secret(
            "contoso",
            "db",
            service.registry().default_kind(),
            crate::item::ContentType::Text,
        );
        item.set_value("s3cret");
        assert!(item.is_dirty());

        service.save(&mut item).await.unwrap();
        assert!(!item.is_dirty());
        assert_eq!(item.identifier().version.as_deref(), Some("v2"));
        assert_eq!(item.checksum_status(), ChecksumStatus::Match);
    }

    #[tokio::test]
    async fn test_save_refuses_missing_required_tags() {
        let mut backend = MockVaultBackend::new();
        backend.expect_set_item().never();
        let service = service(backend);

        let password = service.registry().get("Password").unwrap().clone();
        let mut item = VaultItem::new_secret("contoso", "admin", password, crate::item::ContentType::None);
        item.set_value("CorrectHorse9!");
        item.set_expires(Some(Utc::now() + Duration::days(30)));

        let err = service.save(&mut item).await.unwrap_err();
        assert!(matches!(err, VaultEditError::MissingRequiredTags { ref names } if names == &["owner".to_string()]));
        assert!(item.is_dirty());
    }

    #[tokio::test]
    async fn test_save_counts_computed_tags_against_limit() {
        let mut backend = MockVaultBackend::new();
        backend.expect_set_item().never();
        let service = service(backend);

        let password = service.registry().get("Password").unwrap().clone();
        let mut item = VaultItem::new_secret("contoso", "admin", password, crate::item::ContentType::None);
        item.set_value("CorrectHorse9!");
        item.set_expires(Some(Utc::now() + Duration::days(30)));
        item.tags_mut().set("owner", "ops").unwrap();
        for i in 0..MAX_TAG_COUNT - 2 {
            item.tags_mut().set(format!("tag{i}"), "v").unwrap();
        }
        assert_eq!(item.tags().len(), MAX_TAG_COUNT - 1);
        assert_eq!(item.to_tags().len(), MAX_TAG_COUNT + 1);

        let err = service.save(&mut item).await.unwrap_err();
        assert!(matches!(err, VaultEditError::InvalidTag(_)));

        item.tags_mut().remove("tag0");
        assert!(service.validate(&item).is_ok());
    }

    #[tokio::test]
    async fn test_save_refuses_invalid_name() {
        let mut backend = MockVaultBackend::new();
        backend.expect_set_item().never();
        let service = service(backend);

        let mut item = VaultItem::new_secret(
            "contoso",
            "not valid!",
            service.registry().default_kind(),
            crate::item::ContentType::None,
        );
        item.set_value("v");

        let err = service.save(&mut item).await.unwrap_err();
        assert!(matches!(err, VaultEditError::InvalidItemName { .. }));
    }

    #[tokio::test]
    async fn test_verify_reports_tampered_value() {
        let mut tags = HashMap::new();
        tags.insert(CHECKSUM_TAG_KEY.to_string(), calculate_checksum("original"));
        let record = secret_record("edited in portal", tags);

        let mut backend = MockVaultBackend::new();
        backend
            .expect_get_item()
            .with(always())
            .returning(move |_| Ok(record.clone()));
        let service = service(backend);

        let id = ItemIdentifier::new("contoso", ItemKind::Secret, "db");
        let status = service.verify(&id).await.unwrap();
        assert!(matches!(status, ChecksumStatus::Mismatch { .. }));
    }

    #[tokio::test]
    async fn test_load_propagates_not_found() {
        let mut backend = MockVaultBackend::new();
        backend
            .expect_get_item()
            .returning(|id| Err(VaultEditError::item_not_found(id.name.clone())));
        let service = service(backend);

        let id = ItemIdentifier::new("contoso", ItemKind::Secret, "missing");
        assert!(matches!(
            service.load(&id).await,
            Err(VaultEditError::ItemNotFound { .. })
        ));
    }
}
