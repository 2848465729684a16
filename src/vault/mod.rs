//! Vault access
//!
//! The `VaultBackend` trait, its Azure Key Vault REST implementation and
//! the item service that sits on top of it.

pub mod azure;
pub mod backend;
pub mod service;

pub use azure::AzureKeyVaultClient;
pub use backend::*;
pub use service::ItemService;
