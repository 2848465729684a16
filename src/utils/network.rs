use crate::error::{Result, VaultEditError};
use crate::item::identifier::VAULT_DNS_SUFFIX;
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts and user-friendly error handling
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("vaultedit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| VaultEditError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a transport failure into an error that names the vault involved
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> VaultEditError {
    let vault_name = extract_vault_name_from_url(url);

    if error.is_timeout() {
        return VaultEditError::connection_timeout(format!(
            "Connection to Azure Key Vault '{}' timed out. This might be due to network issues or the vault being unreachable.",
            vault_name
        ));
    }

    let message = error.to_string().to_lowercase();

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return VaultEditError::dns_resolution(
                vault_name.clone(),
                format!("Unable to resolve vault hostname. Please check if the vault name '{}' is correct and the vault exists.", vault_name)
            );
        }

        if message.contains("connection refused") {
            return VaultEditError::network(format!(
                "Connection to Azure Key Vault '{}' was refused. The service may be temporarily unavailable.",
                vault_name
            ));
        }

        return VaultEditError::network(format!(
            "Failed to connect to Azure Key Vault '{}'. Please check your network connection and verify the vault name.",
            vault_name
        ));
    }

    if message.contains("ssl") || message.contains("tls") || message.contains("certificate") {
        return VaultEditError::network(format!(
            "SSL/TLS connection error when accessing vault '{}'. This may be due to certificate issues or network security policies.",
            vault_name
        ));
    }

    if error.is_request() {
        return VaultEditError::invalid_argument(format!(
            "Invalid request to vault '{}'. Please check the vault name and URL format.",
            vault_name
        ));
    }

    if let Some(status) = error.status() {
        match status.as_u16() {
            503 => {
                return VaultEditError::network(format!(
                    "Azure Key Vault '{}' service is temporarily unavailable (503). Please try again later.",
                    vault_name
                ))
            }
            502 | 504 => {
                return VaultEditError::network(format!(
                    "Gateway error ({}) when accessing vault '{}'. The Azure service may be experiencing issues.",
                    status.as_u16(),
                    vault_name
                ))
            }
            _ => {}
        }
    }

    VaultEditError::network(format!(
        "Network error when accessing vault '{}': {}. Please check your internet connection and try again.",
        vault_name, error
    ))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "resolve",
        "lookup",
        "name or service not known",
        "nodename nor servname provided",
        "temporary failure in name resolution",
        "no such host",
        "host not found",
        "getaddrinfo failed",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

/// Extract vault name from a `https://{vault}.vault.azure.net/...` URL
pub fn extract_vault_name_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .and_then(|host| host.strip_suffix(VAULT_DNS_SUFFIX))
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown-vault".to_string())
}

/// Check if an error is worth retrying
pub fn is_retryable_error(error: &VaultEditError) -> bool {
    match error {
        VaultEditError::ConnectionTimeout(_) => true,
        VaultEditError::NetworkError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("temporar")
                || msg_lower.contains("503")
                || msg_lower.contains("502")
                || msg_lower.contains("504")
        }
        VaultEditError::AzureApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("429")
                || msg_lower.contains("503")
                || msg_lower.contains("502")
                || msg_lower.contains("504")
                || msg_lower.contains("throttled")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_vault_name_from_url() {
        let url = "https://test-vault.vault.azure.net/secrets/test-secret";
        assert_eq!(extract_vault_name_from_url(url), "test-vault");
        assert_eq!(extract_vault_name_from_url("https://example.com"), "unknown-vault");
    }

    #[test]
    fn test_is_retryable_error() {
        let timeout_error = VaultEditError::connection_timeout("timeout");
        assert!(is_retryable_error(&timeout_error));

        let throttled = VaultEditError::azure_api("Failed to get item: HTTP 429 Too Many Requests");
        assert!(is_retryable_error(&throttled));

        let dns_error = VaultEditError::dns_resolution("vault", "DNS failed");
        assert!(!is_retryable_error(&dns_error));

        assert!(!is_retryable_error(&VaultEditError::item_not_found("x")));
    }
}
