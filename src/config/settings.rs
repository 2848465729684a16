//! Configuration settings management
//!
//! This module handles loading configuration from the config file and
//! environment, key-based edits from the CLI, and persistence.

use crate::error::{Result, VaultEditError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const APP_DIR: &str = "kve";
const CONFIG_FILE: &str = "kve.toml";

fn default_clipboard_timeout() -> u64 {
    30
}

/// How tokens for Key Vault are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    Default,
    ClientSecret,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Default => f.write_str("default"),
            AuthMethod::ClientSecret => f.write_str("client-secret"),
        }
    }
}

impl FromStr for AuthMethod {
    type Err = VaultEditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "default" | "defaultazurecredential" => Ok(AuthMethod::Default),
            "client-secret" | "clientsecret" => Ok(AuthMethod::ClientSecret),
            other => Err(VaultEditError::config(format!(
                "Unsupported authentication method: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub default_vault: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub auth_method: AuthMethod,
    /// Seconds a copied value stays on the clipboard; 0 keeps it
    #[serde(default = "default_clipboard_timeout")]
    pub clipboard_timeout: u64,
    pub output_json: bool,
    pub no_color: bool,
    /// JSON file with additional secret kinds
    pub secret_kinds_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            default_vault: None,
            tenant_id: None,
            client_id: None,
            auth_method: AuthMethod::Default,
            clipboard_timeout: default_clipboard_timeout(),
            output_json: false,
            no_color: false,
            secret_kinds_path: None,
            export_dir: None,
        }
    }
}

/// Keys accepted by `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "debug",
    "default_vault",
    "tenant_id",
    "client_id",
    "auth_method",
    "clipboard_timeout",
    "output_json",
    "no_color",
    "secret_kinds_path",
    "export_dir",
];

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(VaultEditError::config(format!(
            "{} expects true or false, got '{}'",
            key, value
        ))),
    }
}

fn optional<T>(value: &str, convert: impl FnOnce(&str) -> T) -> Option<T> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(convert(trimmed))
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        // XDG layout on Linux and macOS, platform config dir elsewhere
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| VaultEditError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| VaultEditError::config("Unable to determine config directory"))?;
            Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
        }
    }

    pub async fn load() -> Result<Self> {
        load_config().await
    }

    pub async fn save(&self) -> Result<()> {
        save_config(self).await
    }

    pub fn clipboard_ttl(&self) -> Duration {
        Duration::from_secs(self.clipboard_timeout)
    }

    /// Vault from the command line, falling back to the configured default
    pub fn resolve_vault_name(&self, vault_arg: Option<String>) -> Result<String> {
        vault_arg
            .or_else(|| self.default_vault.clone())
            .filter(|vault| !vault.is_empty())
            .ok_or_else(|| {
                VaultEditError::config(
                    "No vault specified. Use --vault or run 'kve config set default_vault <name>'",
                )
            })
    }

    /// Key/value pairs for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let show = |value: &Option<String>| value.clone().unwrap_or_default();
        let show_path =
            |value: &Option<PathBuf>| value.as_ref().map(|p| p.display().to_string()).unwrap_or_default();

        vec![
            ("debug", self.debug.to_string()),
            ("default_vault", show(&self.default_vault)),
            ("tenant_id", show(&self.tenant_id)),
            ("client_id", show(&self.client_id)),
            ("auth_method", self.auth_method.to_string()),
            ("clipboard_timeout", self.clipboard_timeout.to_string()),
            ("output_json", self.output_json.to_string()),
            ("no_color", self.no_color.to_string()),
            ("secret_kinds_path", show_path(&self.secret_kinds_path)),
            ("export_dir", show_path(&self.export_dir)),
        ]
    }

    /// Set one key from its string form; an empty value clears optional keys
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "debug" => self.debug = parse_bool(key, value)?,
            "default_vault" => self.default_vault = optional(value, str::to_string),
            "tenant_id" => self.tenant_id = optional(value, str::to_string),
            "client_id" => self.client_id = optional(value, str::to_string),
            "auth_method" => self.auth_method = value.parse()?,
            "clipboard_timeout" => {
                self.clipboard_timeout = value.trim().parse().map_err(|_| {
                    VaultEditError::config(format!(
                        "clipboard_timeout expects a number of seconds, got '{}'",
                        value
                    ))
                })?
            }
            "output_json" => self.output_json = parse_bool(key, value)?,
            "no_color" => self.no_color = parse_bool(key, value)?,
            "secret_kinds_path" => self.secret_kinds_path = optional(value, |v| PathBuf::from(v)),
            "export_dir" => self.export_dir = optional(value, |v| PathBuf::from(v)),
            _ => {
                return Err(VaultEditError::config(format!(
                    "Unknown configuration key '{}'. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Load configuration with priority order:
/// 1. Command-line flags (handled by clap)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
pub async fn load_config() -> Result<Config> {
    let config_path = Config::get_config_path()?;
    let mut config = if config_path.exists() {
        load_from_file(&config_path).await?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;

    // TOML first, JSON as fallback
    if let Ok(config) = toml::from_str::<Config>(&contents) {
        return Ok(config);
    }

    serde_json::from_str::<Config>(&contents).map_err(|e| {
        VaultEditError::config(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Apply environment overrides, reading variables through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = lookup("KVE_DEFAULT_VAULT") {
        config.default_vault = optional(&value, str::to_string);
    }

    if let Some(value) = lookup("AZURE_TENANT_ID") {
        config.tenant_id = optional(&value, str::to_string);
    }

    if let Some(value) = lookup("AZURE_CLIENT_ID") {
        config.client_id = optional(&value, str::to_string);
    }

    if let Some(value) = lookup("KVE_AUTH_METHOD") {
        match value.parse() {
            Ok(method) => config.auth_method = method,
            Err(e) => tracing::warn!("ignoring KVE_AUTH_METHOD: {}", e),
        }
    }

    if let Some(value) = lookup("KVE_CLIPBOARD_TTL") {
        match value.trim().parse::<u64>() {
            Ok(seconds) => config.clipboard_timeout = seconds,
            Err(_) => tracing::warn!("ignoring KVE_CLIPBOARD_TTL '{}': not a number", value),
        }
    }

    if let Some(value) = lookup("KVE_SECRET_KINDS") {
        config.secret_kinds_path = optional(&value, |v| PathBuf::from(v));
    }
}

pub async fn save_config(config: &Config) -> Result<()> {
    save_to_file(config, &Config::get_config_path()?).await
}

pub async fn save_to_file(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| VaultEditError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;
    Ok(())
}
