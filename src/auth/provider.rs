//! Authentication provider trait and implementations
//!
//! Key Vault calls carry a bearer token obtained from one of these
//! providers.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;
use tracing::debug;

use crate::config::{AuthMethod, Config};
use crate::error::{Result, VaultEditError};

/// Scope for Azure Key Vault data-plane tokens
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;

    /// Tenant the provider is pinned to, if any
    fn tenant_id(&self) -> Option<&str>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
    tenant_id: Option<String>,
}

impl DefaultAzureCredentialProvider {
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                VaultEditError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?,
        );

        Ok(Self {
            credential,
            tenant_id: None,
        })
    }

    /// Create a provider that reports a specific tenant
    pub fn with_tenant(tenant_id: String) -> Result<Self> {
        let mut provider = Self::new()?;
        provider.tenant_id = Some(tenant_id);
        Ok(provider)
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| VaultEditError::authentication(format!("Failed to get token: {}", e)))
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

/// Service principal authentication with a client secret
pub struct ClientSecretProvider {
    credential: Arc<ClientSecretCredential>,
    tenant_id: String,
}

impl ClientSecretProvider {
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let authority_host = url::Url::parse(AUTHORITY_HOST)
            .map_err(|e| VaultEditError::config(format!("Invalid authority URL: {}", e)))?;

        let credential = Arc::new(ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_host,
            tenant_id.clone(),
            client_id,
            client_secret,
        ));

        Ok(Self {
            credential,
            tenant_id,
        })
    }
}

#[async_trait]
impl AzureAuthProvider for ClientSecretProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| VaultEditError::authentication(format!("Failed to get token: {}", e)))
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }
}

/// Build the provider selected by the configuration.
///
/// The client secret is read from `AZURE_CLIENT_SECRET` and never persisted.
pub fn create_auth_provider(config: &Config) -> Result<Arc<dyn AzureAuthProvider>> {
    match config.auth_method {
        AuthMethod::Default => {
            debug!("using DefaultAzureCredential");
            match &config.tenant_id {
                Some(tenant_id) => Ok(Arc::new(DefaultAzureCredentialProvider::with_tenant(
                    tenant_id.clone(),
                )?)),
                None => Ok(Arc::new(DefaultAzureCredentialProvider::new()?)),
            }
        }
        AuthMethod::ClientSecret => {
            debug!("using client secret credential");
            let tenant_id = config.tenant_id.clone().ok_or_else(|| {
                VaultEditError::config("tenant_id is required for client secret authentication")
            })?;
            let client_id = config.client_id.clone().ok_or_else(|| {
                VaultEditError::config("client_id is required for client secret authentication")
            })?;
            let client_secret = std::env::var("AZURE_CLIENT_SECRET").map_err(|_| {
                VaultEditError::config(
                    "AZURE_CLIENT_SECRET must be set for client secret authentication",
                )
            })?;

            Ok(Arc::new(ClientSecretProvider::new(
                tenant_id,
                client_id,
                client_secret,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_requires_tenant_and_client() {
        let config = Config {
            auth_method: AuthMethod::ClientSecret,
            tenant_id: None,
            client_id: Some("app".to_string()),
            ..Config::default()
        };
        let err = create_auth_provider(&config).err().unwrap();
        assert!(matches!(err, VaultEditError::ConfigError(_)));

        let config = Config {
            auth_method: AuthMethod::ClientSecret,
            tenant_id: Some("tenant".to_string()),
            client_id: None,
            ..Config::default()
        };
        assert!(create_auth_provider(&config).is_err());
    }

    #[test]
    fn test_client_secret_provider_reports_tenant() {
        let provider = ClientSecretProvider::new(
            "tenant".to_string(),
            "client".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        assert_eq!(provider.tenant_id(), Some("tenant"));
    }
}
