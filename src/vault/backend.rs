//! Vault backend abstraction
//!
//! Records exchanged with a vault and the async trait the item service
//! talks to. The Azure REST client implements it for real vaults and
//! `MockVaultBackend` stands in for it in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::Result;
use crate::item::{ItemIdentifier, ItemKind};

/// An item as stored in the vault, value still in its raw encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultItemRecord {
    pub identifier: ItemIdentifier,
    pub value: Option<String>,
    pub content_type: Option<String>,
    pub tags: HashMap<String, String>,
    pub enabled: Option<bool>,
    pub expires: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

fn display_optional(option: &Option<String>) -> String {
    option.clone().unwrap_or_default()
}

fn display_enabled(enabled: &Option<bool>) -> String {
    match enabled {
        Some(false) => "no".to_string(),
        _ => "yes".to_string(),
    }
}

fn display_date(date: &Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Listing entry; values are never part of a listing
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
pub struct ItemSummary {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Kind")]
    pub kind: ItemKind,
    #[tabled(rename = "Content Type", display_with = "display_optional")]
    pub content_type: Option<String>,
    #[tabled(rename = "Enabled", display_with = "display_enabled")]
    pub enabled: Option<bool>,
    #[tabled(rename = "Expires", display_with = "display_date")]
    pub expires: Option<DateTime<Utc>>,
    #[tabled(rename = "Updated", display_with = "display_date")]
    pub updated: Option<DateTime<Utc>>,
    #[tabled(skip)]
    pub tags: HashMap<String, String>,
}

/// Create-or-update request for one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetItemRequest {
    /// Unversioned target
    pub identifier: ItemIdentifier,
    /// Raw value; only secrets carry one
    pub value: Option<String>,
    pub content_type: Option<String>,
    pub tags: HashMap<String, String>,
    pub enabled: Option<bool>,
    pub expires: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
}

/// Operations a vault store must provide
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Fetch one item, latest version unless the identifier names one
    async fn get_item(&self, identifier: &ItemIdentifier) -> Result<VaultItemRecord>;

    /// List the items of one kind in a vault
    async fn list_items(&self, vault_name: &str, kind: ItemKind) -> Result<Vec<ItemSummary>>;

    /// Create or update an item and return the stored record
    async fn set_item(&self, request: &SetItemRequest) -> Result<VaultItemRecord>;

    async fn delete_item(&self, identifier: &ItemIdentifier) -> Result<()>;
}
