//! Azure Key Vault REST backend
//!
//! Talks to the Key Vault data plane (`api-version=7.4`) directly with
//! bearer tokens from the configured auth provider. Secrets are written
//! with PUT; certificates and keys only have their attributes and tags
//! updated with PATCH.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::{AzureAuthProvider, KEY_VAULT_SCOPE};
use crate::error::{Result, VaultEditError};
use crate::item::{ItemIdentifier, ItemKind};
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};
use crate::utils::retry::{retry_with_backoff, RetryOptions};
use crate::vault::backend::{ItemSummary, SetItemRequest, VaultBackend, VaultItemRecord};

pub const API_VERSION: &str = "7.4";

pub struct AzureKeyVaultClient {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    retry: RetryOptions,
}

impl AzureKeyVaultClient {
    pub fn new(auth_provider: Arc<dyn AzureAuthProvider>) -> Result<Self> {
        Self::with_options(auth_provider, &NetworkConfig::default(), RetryOptions::default())
    }

    pub fn with_options(
        auth_provider: Arc<dyn AzureAuthProvider>,
        network: &NetworkConfig,
        retry: RetryOptions,
    ) -> Result<Self> {
        Ok(Self {
            auth_provider,
            http_client: create_http_client(network)?,
            retry,
        })
    }

    fn item_url(identifier: &ItemIdentifier) -> String {
        let mut url = format!(
            "{}/{}/{}",
            identifier.vault_uri(),
            identifier.kind.collection(),
            identifier.name
        );
        if let Some(version) = &identifier.version {
            url.push('/');
            url.push_str(version);
        }
        format!("{}?api-version={}", url, API_VERSION)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        item_name: &str,
    ) -> Result<Value> {
        let token = self.auth_provider.get_token(&[KEY_VAULT_SCOPE]).await?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token.token.secret())
                .parse()
                .map_err(|e| VaultEditError::azure_api(format!("Invalid token format: {}", e)))?,
        );

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, url);
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e, url))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error(status, &text, &method, item_name));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            VaultEditError::serialization(format!("Failed to parse vault response: {}", e))
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        item_name: &str,
    ) -> Result<Value> {
        retry_with_backoff(
            || self.send_once(method.clone(), url, body, item_name),
            self.retry.clone(),
        )
        .await
    }
}

#[async_trait]
impl VaultBackend for AzureKeyVaultClient {
    async fn get_item(&self, identifier: &ItemIdentifier) -> Result<VaultItemRecord> {
        let url = Self::item_url(identifier);
        let json = self
            .send(Method::GET, &url, None, &identifier.name)
            .await?;
        parse_item_record(identifier.kind, &json)
    }

    async fn list_items(&self, vault_name: &str, kind: ItemKind) -> Result<Vec<ItemSummary>> {
        let mut next = Some(format!(
            "https://{}{}/{}?api-version={}",
            vault_name,
            crate::item::identifier::VAULT_DNS_SUFFIX,
            kind.collection(),
            API_VERSION
        ));
        let mut summaries = Vec::new();

        while let Some(url) = next.take() {
            let page = self.send(Method::GET, &url, None, vault_name).await?;
            if let Some(values) = page.get("value").and_then(Value::as_array) {
                summaries.extend(values.iter().filter_map(|v| parse_item_summary(kind, v)));
            }
            next = page
                .get("nextLink")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string);
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("listed {} {} item(s) in {}", summaries.len(), kind, vault_name);
        Ok(summaries)
    }

    async fn set_item(&self, request: &SetItemRequest) -> Result<VaultItemRecord> {
        let identifier = &request.identifier;
        let url = format!(
            "{}/{}/{}?api-version={}",
            identifier.vault_uri(),
            identifier.kind.collection(),
            identifier.name,
            API_VERSION
        );
        let body = build_set_body(request)?;
        let method = match identifier.kind {
            ItemKind::Secret => Method::PUT,
            ItemKind::Certificate | ItemKind::Key => Method::PATCH,
        };

        let json = self
            .send(method, &url, Some(&body), &identifier.name)
            .await?;
        debug!("stored {}", identifier);
        parse_item_record(identifier.kind, &json)
    }

    async fn delete_item(&self, identifier: &ItemIdentifier) -> Result<()> {
        let url = format!(
            "{}/{}/{}?api-version={}",
            identifier.vault_uri(),
            identifier.kind.collection(),
            identifier.name,
            API_VERSION
        );
        self.send(Method::DELETE, &url, None, &identifier.name)
            .await?;
        info!("deleted {}", identifier);
        Ok(())
    }
}

fn status_error(status: StatusCode, body: &str, method: &Method, item_name: &str) -> VaultEditError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::NOT_FOUND => VaultEditError::item_not_found(item_name),
        StatusCode::UNAUTHORIZED => VaultEditError::authentication(detail),
        StatusCode::FORBIDDEN => VaultEditError::permission_denied(detail),
        _ => VaultEditError::azure_api(format!(
            "{} '{}' failed: HTTP {} - {}",
            method, item_name, status, detail
        )),
    }
}

/// Request body for creating or updating an item
pub fn build_set_body(request: &SetItemRequest) -> Result<Value> {
    let mut body = json!({ "tags": request.tags });

    let mut attributes = serde_json::Map::new();
    if let Some(enabled) = request.enabled {
        attributes.insert("enabled".to_string(), json!(enabled));
    }
    if let Some(expires) = request.expires {
        attributes.insert("exp".to_string(), json!(expires.timestamp()));
    }
    if let Some(not_before) = request.not_before {
        attributes.insert("nbf".to_string(), json!(not_before.timestamp()));
    }
    if !attributes.is_empty() {
        body["attributes"] = Value::Object(attributes);
    }

    if request.identifier.kind == ItemKind::Secret {
        let value = request.value.as_ref().ok_or_else(|| {
            VaultEditError::invalid_item_value(format!(
                "secret '{}' has no value to store",
                request.identifier.name
            ))
        })?;
        body["value"] = json!(value);
        if let Some(content_type) = &request.content_type {
            body["contentType"] = json!(content_type);
        }
    }

    Ok(body)
}

fn timestamp(attributes: Option<&Value>, key: &str) -> Option<DateTime<Utc>> {
    attributes
        .and_then(|a| a.get(key))
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn string_tags(json: &Value) -> HashMap<String, String> {
    json.get("tags")
        .and_then(Value::as_object)
        .map(|tags| {
            tags.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Item URI of a bundle; keys carry it inside the JWK
fn bundle_id(kind: ItemKind, json: &Value) -> Option<&str> {
    match kind {
        ItemKind::Key => json
            .pointer("/key/kid")
            .or_else(|| json.get("kid"))
            .and_then(Value::as_str),
        ItemKind::Secret | ItemKind::Certificate => json.get("id").and_then(Value::as_str),
    }
}

/// Convert a secret, certificate or key bundle into a record
pub fn parse_item_record(kind: ItemKind, json: &Value) -> Result<VaultItemRecord> {
    let id = bundle_id(kind, json)
        .ok_or_else(|| VaultEditError::serialization("vault response has no item id"))?;
    let identifier = ItemIdentifier::parse(id)?;

    let value = match kind {
        ItemKind::Secret => json.get("value").and_then(Value::as_str).map(str::to_string),
        ItemKind::Certificate => json.get("cer").and_then(Value::as_str).map(str::to_string),
        ItemKind::Key => json.get("key").map(Value::to_string),
    };
    let content_type = match kind {
        ItemKind::Secret => json
            .get("contentType")
            .and_then(Value::as_str)
            .map(str::to_string),
        ItemKind::Certificate | ItemKind::Key => None,
    };

    let attributes = json.get("attributes");
    Ok(VaultItemRecord {
        identifier,
        value,
        content_type,
        tags: string_tags(json),
        enabled: attributes
            .and_then(|a| a.get("enabled"))
            .and_then(Value::as_bool),
        expires: timestamp(attributes, "exp"),
        not_before: timestamp(attributes, "nbf"),
        created: timestamp(attributes, "created"),
        updated: timestamp(attributes, "updated"),
    })
}

/// Convert one entry of a list page; entries without a usable id are skipped
pub fn parse_item_summary(kind: ItemKind, json: &Value) -> Option<ItemSummary> {
    let id = bundle_id(kind, json)?;
    let name = id
        .split('?')
        .next()
        .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
        .filter(|name| !name.is_empty())?
        .to_string();
    let attributes = json.get("attributes");

    Some(ItemSummary {
        name,
        kind,
        content_type: json
            .get("contentType")
            .and_then(Value::as_str)
            .map(str::to_string),
        enabled: attributes
            .and_then(|a| a.get("enabled"))
            .and_then(Value::as_bool),
        expires: timestamp(attributes, "exp"),
        updated: timestamp(attributes, "updated"),
        tags: string_tags(json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secret_bundle() {
        let json = json!({
            "value": "s3cret",
            "contentType": "text/plain",
            "id": "https://contoso.vault.azure.net/secrets/db/4387e9f3",
            "attributes": {
                "enabled": true,
                "exp": 1_700_000_000,
                "created": 1_600_000_000,
                "updated": 1_600_000_100
            },
            "tags": { "Sha256": "abc", "owner": "ops" }
        });

        let record = parse_item_record(ItemKind::Secret, &json).unwrap();
        assert_eq!(record.identifier.vault_name, "contoso");
        assert_eq!(record.identifier.name, "db");
        assert_eq!(record.identifier.version.as_deref(), Some("4387e9f3"));
        assert_eq!(record.value.as_deref(), Some("s3cret"));
        assert_eq!(record.content_type.as_deref(), Some("text/plain"));
        assert_eq!(record.enabled, Some(true));
        assert_eq!(record.expires.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.not_before, None);
        assert_eq!(record.tags.get("owner").map(String::as_str), Some("ops"));
    }

    #[test]
    fn test_parse_key_bundle_uses_kid() {
        let json = json!({
            "key": { "kid": "https://contoso.vault.azure.net/keys/signing/v2", "kty": "RSA" },
            "attributes": { "enabled": false }
        });

        let record = parse_item_record(ItemKind::Key, &json).unwrap();
        assert_eq!(record.identifier.kind, ItemKind::Key);
        assert_eq!(record.identifier.name, "signing");
        assert_eq!(record.enabled, Some(false));
        let jwk: Value = serde_json::from_str(record.value.as_deref().unwrap()).unwrap();
        assert_eq!(jwk["kty"], "RSA");
    }

    #[test]
    fn test_parse_certificate_bundle_takes_cer() {
        let json = json!({
            "id": "https://contoso.vault.azure.net/certificates/web-tls/v1",
            "cer": "MIIB",
            "contentType": "ignored"
        });
        let record = parse_item_record(ItemKind::Certificate, &json).unwrap();
        assert_eq!(record.value.as_deref(), Some("MIIB"));
        assert_eq!(record.content_type, None);
    }

    #[test]
    fn test_parse_summary_skips_entries_without_id() {
        assert!(parse_item_summary(ItemKind::Secret, &json!({ "attributes": {} })).is_none());

        let summary = parse_item_summary(
            ItemKind::Key,
            &json!({ "kid": "https://contoso.vault.azure.net/keys/signing", "tags": {} }),
        )
        .unwrap();
        assert_eq!(summary.name, "signing");
        assert_eq!(summary.kind, ItemKind::Key);
    }

    #[test]
    fn test_set_body_for_secret_includes_value_and_attributes() {
        let mut tags = HashMap::new();
        tags.insert("Sha256".to_string(), "abc".to_string());
        let request = SetItemRequest {
            identifier: ItemIdentifier::new("contoso", ItemKind::Secret, "db"),
            value: Some("s3cret".to_string()),
            content_type: Some("text/plain".to_string()),
            tags,
            enabled: Some(true),
            expires: DateTime::from_timestamp(1_700_000_000, 0),
            not_before: None,
        };

        let body = build_set_body(&request).unwrap();
        assert_eq!(body["value"], "s3cret");
        assert_eq!(body["contentType"], "text/plain");
        assert_eq!(body["tags"]["Sha256"], "abc");
        assert_eq!(body["attributes"]["enabled"], true);
        assert_eq!(body["attributes"]["exp"], 1_700_000_000);
        assert!(body["attributes"].get("nbf").is_none());
    }

    #[test]
    fn test_set_body_for_certificate_omits_value() {
        let request = SetItemRequest {
            identifier: ItemIdentifier::new("contoso", ItemKind::Certificate, "web"),
            value: Some("ignored".to_string()),
            ..Default::default()
        };
        let body = build_set_body(&request).unwrap();
        assert!(body.get("value").is_none());
        assert!(body.get("attributes").is_none());
    }

    #[test]
    fn test_set_body_for_secret_requires_value() {
        let request = SetItemRequest {
            identifier: ItemIdentifier::new("contoso", ItemKind::Secret, "db"),
            ..Default::default()
        };
        assert!(build_set_body(&request).is_err());
    }

    #[test]
    fn test_status_errors_are_classified() {
        let err = status_error(StatusCode::NOT_FOUND, "", &Method::GET, "db");
        assert!(matches!(err, VaultEditError::ItemNotFound { .. }));

        let err = status_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":"Forbidden","message":"no access"}}"#,
            &Method::GET,
            "db",
        );
        assert!(matches!(err, VaultEditError::PermissionDenied(ref m) if m == "no access"));

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "", &Method::PUT, "db");
        assert!(crate::utils::network::is_retryable_error(&err));
    }

    #[test]
    fn test_item_url_includes_version() {
        let id = ItemIdentifier::new("contoso", ItemKind::Secret, "db").with_version("v1");
        assert_eq!(
            AzureKeyVaultClient::item_url(&id),
            "https://contoso.vault.azure.net/secrets/db/v1?api-version=7.4"
        );
    }
}
