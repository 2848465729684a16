//! Authentication module for Azure Key Vault
//!
//! Bearer tokens come from DefaultAzureCredential or a service principal
//! client secret, chosen by configuration.

pub mod provider;

pub use provider::*;
