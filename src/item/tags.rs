//! Observable tag collection
//!
//! User-editable tags of a vault item. Reserved keys are system-computed
//! and can never be set through the collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::{Result, VaultEditError};
use crate::item::notify::{ChangeNotifier, PropertyChange, TagChange};

/// Tag holding the integrity checksum of the raw value
pub const CHECKSUM_TAG_KEY: &str = "Sha256";

/// Tag holding the alias of the item's secret kind
pub const SECRET_KIND_TAG_KEY: &str = "SecretKind";

/// Tag holding the SHA-256 thumbprint of a certificate
pub const THUMBPRINT_TAG_KEY: &str = "Sha256Thumbprint";

/// Azure Key Vault tag limits
pub const MAX_TAG_COUNT: usize = 15;
pub const MAX_TAG_NAME_LENGTH: usize = 512;
pub const MAX_TAG_VALUE_LENGTH: usize = 256;

const RESERVED_TAG_KEYS: [&str; 2] = [CHECKSUM_TAG_KEY, SECRET_KIND_TAG_KEY];

/// Canonical spelling of a reserved key, matched case-insensitively
fn reserved_key(name: &str) -> Option<&'static str> {
    RESERVED_TAG_KEYS
        .iter()
        .copied()
        .find(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Whether the key is computed by the system and never user-supplied
pub fn is_reserved_tag(name: &str) -> bool {
    reserved_key(name).is_some()
}

/// Single tag entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct TagItem {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl TagItem {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(VaultEditError::invalid_tag("tag name cannot be empty"));
        }
        if self.name.chars().count() > MAX_TAG_NAME_LENGTH {
            return Err(VaultEditError::invalid_tag(format!(
                "tag name '{}' exceeds {} characters",
                self.name, MAX_TAG_NAME_LENGTH
            )));
        }
        if self.value.chars().count() > MAX_TAG_VALUE_LENGTH {
            return Err(VaultEditError::invalid_tag(format!(
                "value of tag '{}' exceeds {} characters",
                self.name, MAX_TAG_VALUE_LENGTH
            )));
        }
        Ok(())
    }
}

impl From<(String, String)> for TagItem {
    fn from((name, value): (String, String)) -> Self {
        Self { name, value }
    }
}

/// Tag collection publishing changes on the owning item's notifier
#[derive(Debug, Clone)]
pub struct TagCollection {
    items: Vec<TagItem>,
    notifier: ChangeNotifier,
}

impl TagCollection {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self {
            items: Vec::new(),
            notifier,
        }
    }

    /// Build from a vault tag map without notifying.
    ///
    /// Reserved keys are split off and returned separately under their
    /// canonical spelling. User tags are sorted by name since vault maps
    /// carry no order.
    pub fn from_map(
        tags: &HashMap<String, String>,
        notifier: ChangeNotifier,
    ) -> (Self, HashMap<String, String>) {
        let mut items = Vec::new();
        let mut reserved = HashMap::new();

        for (name, value) in tags {
            if let Some(key) = reserved_key(name) {
                reserved.insert(key.to_string(), value.clone());
            } else {
                items.push(TagItem::new(name.clone(), value.clone()));
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        (Self { items, notifier }, reserved)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or update a tag
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> Result<()> {
        let tag = TagItem::new(name, value);
        if is_reserved_tag(&tag.name) {
            return Err(VaultEditError::reserved_tag(tag.name));
        }
        tag.validate()?;

        if let Some(existing) = self.items.iter_mut().find(|item| item.name == tag.name) {
            if existing.value == tag.value {
                return Ok(());
            }
            existing.value = tag.value;
            let name = existing.name.clone();
            self.notifier
                .notify(PropertyChange::Tags(TagChange::Updated(name)));
            return Ok(());
        }

        // Leave room for the checksum tag added at persistence time
        if self.items.len() + 1 >= MAX_TAG_COUNT {
            return Err(VaultEditError::invalid_tag(format!(
                "an item can carry at most {} user tags",
                MAX_TAG_COUNT - 1
            )));
        }

        let name = tag.name.clone();
        self.items.push(tag);
        self.notifier.notify(PropertyChange::Tags(TagChange::Added(name)));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.name != name);
        let removed = self.items.len() != before;
        if removed {
            self.notifier
                .notify(PropertyChange::Tags(TagChange::Removed(name.to_string())));
        }
        removed
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.notifier.notify(PropertyChange::Tags(TagChange::Cleared));
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .map(|item| (item.name.clone(), item.value.clone()))
            .collect()
    }
}
