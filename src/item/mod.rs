//! Editable vault items
//!
//! This module provides the item model behind every editor: identifiers,
//! item and content kinds, secret kinds, the observable tag collection, and
//! [`VaultItem`] itself with its derived raw value, checksum and tag map.

pub mod checksum;
pub mod content_type;
pub mod export;
pub mod identifier;
pub mod kind;
pub mod notify;
pub mod property;
pub mod secret_kind;
pub mod tags;

pub use checksum::calculate_checksum;
pub use content_type::{ContentType, FileEncoding};
pub use export::{load_from_file, save_to_file, write_internet_shortcut, ExportedItem};
pub use identifier::ItemIdentifier;
pub use kind::ItemKind;
pub use notify::{ChangeListener, ChangeNotifier, PropertyChange, SubscriptionId, TagChange};
pub use property::{ChecksumStatus, VaultItem};
pub use secret_kind::{SecretKind, SecretKindDefinition, SecretKindRegistry};
pub use tags::{TagCollection, TagItem, CHECKSUM_TAG_KEY, SECRET_KIND_TAG_KEY};
