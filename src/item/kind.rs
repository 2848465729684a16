//! Vault item kinds
//!
//! Secrets, certificates and keys live in separate Key Vault collections and
//! each contributes its own export extension and computed tags.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultEditError};
use crate::item::checksum::calculate_checksum_bytes;
use crate::item::content_type::ContentType;
use crate::item::secret_kind::SecretKind;
use crate::item::tags::{TagItem, SECRET_KIND_TAG_KEY, THUMBPRINT_TAG_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Secret,
    Certificate,
    Key,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Secret, ItemKind::Certificate, ItemKind::Key];

    /// Key Vault REST collection segment
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::Secret => "secrets",
            ItemKind::Certificate => "certificates",
            ItemKind::Key => "keys",
        }
    }

    pub fn from_collection(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection().eq_ignore_ascii_case(segment))
    }

    /// Asset type used by Azure portal deep links
    pub fn portal_asset(&self) -> &'static str {
        match self {
            ItemKind::Secret => "Secret",
            ItemKind::Certificate => "Certificate",
            ItemKind::Key => "Key",
        }
    }

    /// Extension of the full-fidelity export envelope
    pub fn key_vault_file_extension(&self) -> &'static str {
        match self {
            ItemKind::Secret => ".kv-secret",
            ItemKind::Certificate => ".kv-certificate",
            ItemKind::Key => ".kv-key",
        }
    }

    pub fn from_key_vault_file_extension(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.ends_with(kind.key_vault_file_extension()))
    }

    pub fn default_content_type(&self) -> ContentType {
        match self {
            ItemKind::Secret => ContentType::None,
            ItemKind::Certificate => ContentType::Certificate,
            ItemKind::Key => ContentType::Jwk,
        }
    }

    /// Tags derived from the item's current state
    pub fn computed_tags(&self, secret_kind: &SecretKind, raw_value: &str) -> Vec<TagItem> {
        match self {
            ItemKind::Secret => {
                if secret_kind.is_default() {
                    Vec::new()
                } else {
                    vec![TagItem::new(SECRET_KIND_TAG_KEY, secret_kind.alias())]
                }
            }
            ItemKind::Certificate => match STANDARD.decode(raw_value.trim()) {
                Ok(der) if !der.is_empty() => vec![TagItem::new(
                    THUMBPRINT_TAG_KEY,
                    calculate_checksum_bytes(&der).to_uppercase(),
                )],
                _ => Vec::new(),
            },
            ItemKind::Key => Vec::new(),
        }
    }

    /// Label used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemKind::Secret => "Secret",
            ItemKind::Certificate => "Certificate",
            ItemKind::Key => "Key",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Secret => f.write_str("secret"),
            ItemKind::Certificate => f.write_str("certificate"),
            ItemKind::Key => f.write_str("key"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = VaultEditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "secret" | "secrets" => Ok(ItemKind::Secret),
            "certificate" | "certificates" | "cert" => Ok(ItemKind::Certificate),
            "key" | "keys" => Ok(ItemKind::Key),
            other => Err(VaultEditError::invalid_argument(format!(
                "Unknown item kind '{other}'"
            ))),
        }
    }
}
