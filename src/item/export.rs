//! Saving items to files and loading them back
//!
//! Files named with the item kind's Key Vault extension (`.kv-secret`, ...)
//! hold a JSON envelope with every field of the item. Any other file holds
//! only the value, laid out according to the content type.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VaultEditError};
use crate::item::content_type::{ContentType, FileEncoding};
use crate::item::identifier::ItemIdentifier;
use crate::item::kind::ItemKind;
use crate::item::property::VaultItem;
use crate::item::secret_kind::SecretKindRegistry;
use crate::vault::VaultItemRecord;

/// Full-fidelity export envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedItem {
    pub kind: ItemKind,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Raw vault value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
}

impl ExportedItem {
    pub fn from_item(item: &VaultItem) -> Self {
        Self {
            kind: item.kind(),
            id: item.identifier().identifier(),
            name: item.name().unwrap_or_default().to_string(),
            content_type: item.content_type().mime().map(str::to_string),
            value: item.value().map(|_| item.raw_value()),
            tags: item.to_tags(),
            enabled: item.enabled(),
            expires: item.expires(),
            not_before: item.not_before(),
        }
    }
}

fn file_name_of(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            VaultEditError::invalid_argument(format!("Invalid file path: {}", path.display()))
        })
}

/// Write `contents` readable by the owner only; exports carry secret material
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
    };

    #[cfg(not(unix))]
    let mut file = std::fs::File::create(path)?;

    // mode() only applies on creation; tighten files that already existed
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    Ok(())
}

/// Write the item to `path`
pub fn save_to_file(item: &VaultItem, path: &Path) -> Result<()> {
    let file_name = file_name_of(path)?;

    if file_name
        .to_ascii_lowercase()
        .ends_with(item.key_vault_file_extension())
    {
        let envelope = ExportedItem::from_item(item);
        write_private(path, serde_json::to_string_pretty(&envelope)?.as_bytes())?;
        debug!("exported {} envelope to {}", item.kind(), path.display());
        return Ok(());
    }

    match item.content_type().file_encoding() {
        FileEncoding::HumanText => {
            write_private(path, item.value().unwrap_or_default().as_bytes())?;
        }
        FileEncoding::RawText => {
            write_private(path, item.raw_value().as_bytes())?;
        }
        FileEncoding::RawBytes => {
            let bytes = STANDARD.decode(item.raw_value().trim())?;
            write_private(path, &bytes)?;
        }
    }
    debug!("saved {} to {}", item.identifier(), path.display());
    Ok(())
}

/// Load an item previously written by [`save_to_file`] or any value file.
///
/// Envelope files keep their kind but are re-targeted at `vault_name`. Plain
/// files become new secrets named after the file.
pub fn load_from_file(
    path: &Path,
    vault_name: &str,
    registry: &SecretKindRegistry,
) -> Result<VaultItem> {
    let file_name = file_name_of(path)?;

    if let Some(kind) = ItemKind::from_key_vault_file_extension(file_name) {
        let contents = std::fs::read_to_string(path)?;
        let envelope: ExportedItem = serde_json::from_str(&contents)?;
        if envelope.kind != kind {
            return Err(VaultEditError::invalid_argument(format!(
                "{} holds a {} but its extension says {}",
                path.display(),
                envelope.kind,
                kind
            )));
        }

        let record = VaultItemRecord {
            identifier: ItemIdentifier::new(vault_name, kind, envelope.name),
            value: envelope.value,
            content_type: envelope.content_type,
            tags: envelope.tags,
            enabled: envelope.enabled,
            expires: envelope.expires,
            not_before: envelope.not_before,
            ..Default::default()
        };
        return Ok(VaultItem::from_record(&record, registry));
    }

    let content_type = ContentType::from_extension(file_name).unwrap_or(ContentType::None);
    let name = if content_type == ContentType::None {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name)
            .to_string()
    } else {
        file_name[..file_name.len() - content_type.extension().len()].to_string()
    };

    let bytes = std::fs::read(path)?;
    let value = match content_type.file_encoding() {
        FileEncoding::HumanText => String::from_utf8(bytes).map_err(|_| {
            VaultEditError::encoding(format!("{} is not valid UTF-8 text", path.display()))
        })?,
        FileEncoding::RawText => {
            let raw = String::from_utf8(bytes).map_err(|_| {
                VaultEditError::encoding(format!("{} is not valid UTF-8 text", path.display()))
            })?;
            content_type.from_raw_value(&raw)?
        }
        FileEncoding::RawBytes => content_type.from_raw_value(&STANDARD.encode(bytes))?,
    };

    let mut item = VaultItem::new_secret(vault_name, &name, registry.default_kind(), content_type);
    item.set_value(value);
    Ok(item)
}

/// Write `<name>.url` pointing at the item in the portal
pub fn write_internet_shortcut(item: &VaultItem, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.url", item.name().unwrap_or_default()));
    std::fs::write(&path, item.link_as_internet_shortcut())?;
    Ok(path)
}
