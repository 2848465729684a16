//! Vault item identifiers
//!
//! Identifies one version of one item in one vault, and converts to and from
//! the canonical `https://{vault}.vault.azure.net/{collection}/{name}/{version}`
//! form used by the Key Vault REST API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, VaultEditError};
use crate::item::kind::ItemKind;

pub const VAULT_DNS_SUFFIX: &str = ".vault.azure.net";

const PORTAL_ASSET_URL: &str = "https://portal.azure.com/#asset/Microsoft_Azure_KeyVault";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ItemIdentifier {
    pub vault_name: String,
    pub kind: ItemKind,
    pub name: String,
    pub version: Option<String>,
}

impl ItemIdentifier {
    pub fn new<V: Into<String>, N: Into<String>>(vault_name: V, kind: ItemKind, name: N) -> Self {
        Self {
            vault_name: vault_name.into(),
            kind,
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        let version = version.into();
        self.version = if version.is_empty() { None } else { Some(version) };
        self
    }

    /// Parse a Key Vault item URI
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| VaultEditError::invalid_identifier(format!("{uri}: {e}")))?;

        if url.scheme() != "https" {
            return Err(VaultEditError::invalid_identifier(format!(
                "{uri}: expected an https URI"
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| VaultEditError::invalid_identifier(format!("{uri}: missing host")))?;
        let vault_name = host
            .strip_suffix(VAULT_DNS_SUFFIX)
            .filter(|name| !name.is_empty() && !name.contains('.'))
            .ok_or_else(|| {
                VaultEditError::invalid_identifier(format!(
                    "{uri}: host must end with {VAULT_DNS_SUFFIX}"
                ))
            })?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let (collection, name, version) = match segments.as_slice() {
            [collection, name] => (*collection, *name, None),
            [collection, name, version] => (*collection, *name, Some(version.to_string())),
            _ => {
                return Err(VaultEditError::invalid_identifier(format!(
                    "{uri}: expected /{{collection}}/{{name}}[/{{version}}]"
                )))
            }
        };

        let kind = ItemKind::from_collection(collection).ok_or_else(|| {
            VaultEditError::invalid_identifier(format!(
                "{uri}: unknown collection '{collection}'"
            ))
        })?;

        Ok(Self {
            vault_name: vault_name.to_string(),
            kind,
            name: name.to_string(),
            version,
        })
    }

    pub fn vault_uri(&self) -> String {
        format!("https://{}{}", self.vault_name, VAULT_DNS_SUFFIX)
    }

    /// Canonical item URI, including the version when known
    pub fn identifier(&self) -> String {
        match &self.version {
            Some(version) => format!(
                "{}/{}/{}/{}",
                self.vault_uri(),
                self.kind.collection(),
                self.name,
                version
            ),
            None => format!("{}/{}/{}", self.vault_uri(), self.kind.collection(), self.name),
        }
    }

    /// Azure portal deep link to the item
    pub fn vault_link(&self) -> String {
        format!(
            "{}/{}/{}",
            PORTAL_ASSET_URL,
            self.kind.portal_asset(),
            self.identifier()
        )
    }
}

impl fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for ItemIdentifier {
    type Err = VaultEditError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
