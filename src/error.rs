use thiserror::Error;

/// Main error type for vaultedit operations
#[derive(Debug, Error)]
pub enum VaultEditError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Item not found: {name}")]
    ItemNotFound { name: String },

    #[error("Invalid item name: {name}")]
    InvalidItemName { name: String },

    #[error("Invalid item value: {0}")]
    InvalidItemValue(String),

    #[error("Invalid item identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Tag '{name}' is reserved and computed automatically")]
    ReservedTag { name: String },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Missing required tags: {}", .names.join(", "))]
    MissingRequiredTags { names: Vec<String> },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("DNS resolution failed for vault '{vault_name}': {details}")]
    DnsResolutionError { vault_name: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl VaultEditError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn item_not_found<S: Into<String>>(name: S) -> Self {
        Self::ItemNotFound { name: name.into() }
    }

    pub fn invalid_item_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidItemName { name: name.into() }
    }

    pub fn invalid_item_value<S: Into<String>>(msg: S) -> Self {
        Self::InvalidItemValue(msg.into())
    }

    pub fn invalid_identifier<S: Into<String>>(msg: S) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    pub fn reserved_tag<S: Into<String>>(name: S) -> Self {
        Self::ReservedTag { name: name.into() }
    }

    pub fn invalid_tag<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTag(msg.into())
    }

    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::EncodingError(msg.into())
    }

    pub fn clipboard<S: Into<String>>(msg: S) -> Self {
        Self::ClipboardError(msg.into())
    }

    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn dns_resolution<S: Into<String>>(vault_name: S, details: S) -> Self {
        Self::DnsResolutionError {
            vault_name: vault_name.into(),
            details: details.into(),
        }
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown<S: Into<String>>(msg: S) -> Self {
        Self::Unknown(msg.into())
    }
}

/// Result type alias for vaultedit operations
pub type Result<T> = std::result::Result<T, VaultEditError>;

/// Convert Azure Core errors to VaultEditError
impl From<azure_core::Error> for VaultEditError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}

impl From<toml::de::Error> for VaultEditError {
    fn from(error: toml::de::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

impl From<arboard::Error> for VaultEditError {
    fn from(error: arboard::Error) -> Self {
        Self::ClipboardError(error.to_string())
    }
}
