//! Secret kinds
//!
//! A secret kind classifies a secret and carries the naming and value rules
//! it must satisfy before upload. Kinds are built in or loaded from a JSON
//! definitions file.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::{debug, warn};

use crate::error::{Result, VaultEditError};

pub const DEFAULT_SECRET_KIND: &str = "Custom";

/// Maximum secret value size accepted by Azure Key Vault
pub const MAX_SECRET_VALUE_LENGTH: usize = 25 * 1024;

const DEFAULT_NAME_REGEX: &str = r"^[0-9a-zA-Z-]{1,127}$";
const DEFAULT_VALUE_REGEX: &str = r"(?s)^.*$";

/// Serialized form of a secret kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretKindDefinition {
    pub alias: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_name_regex")]
    pub name_regex: String,
    #[serde(default = "default_value_regex")]
    pub value_regex: String,
    #[serde(default)]
    pub value_template: String,
    #[serde(default = "default_max_value_length")]
    pub max_value_length: usize,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub max_expiration_days: Option<i64>,
}

fn default_name_regex() -> String {
    DEFAULT_NAME_REGEX.to_string()
}

fn default_value_regex() -> String {
    DEFAULT_VALUE_REGEX.to_string()
}

fn default_max_value_length() -> usize {
    MAX_SECRET_VALUE_LENGTH
}

/// Compiled secret kind
#[derive(Debug, Clone)]
pub struct SecretKind {
    definition: SecretKindDefinition,
    name_regex: Regex,
    value_regex: Regex,
}

impl SecretKind {
    pub fn compile(definition: SecretKindDefinition) -> Result<Self> {
        if definition.alias.trim().is_empty() {
            return Err(VaultEditError::config("secret kind alias cannot be empty"));
        }
        let name_regex = Regex::new(&definition.name_regex)?;
        let value_regex = Regex::new(&definition.value_regex)?;
        Ok(Self {
            definition,
            name_regex,
            value_regex,
        })
    }

    /// Kinds shipped with the tool
    pub fn builtin() -> Vec<SecretKind> {
        builtin_definitions()
            .into_iter()
            .filter_map(|definition| match SecretKind::compile(definition) {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!("invalid built-in secret kind: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn alias(&self) -> &str {
        &self.definition.alias
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn value_template(&self) -> &str {
        &self.definition.value_template
    }

    pub fn required_tags(&self) -> &[String] {
        &self.definition.required_tags
    }

    pub fn max_expiration_days(&self) -> Option<i64> {
        self.definition.max_expiration_days
    }

    pub fn definition(&self) -> &SecretKindDefinition {
        &self.definition
    }

    pub fn is_default(&self) -> bool {
        self.definition.alias.eq_ignore_ascii_case(DEFAULT_SECRET_KIND)
    }

    pub fn is_name_valid(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.name_regex.is_match(name))
    }

    pub fn is_value_valid(&self, value: Option<&str>) -> bool {
        value.is_some_and(|value| {
            value.len() <= self.definition.max_value_length && self.value_regex.is_match(value)
        })
    }

    /// Required tags absent from (or empty in) the given map
    pub fn missing_required_tags(&self, tags: &HashMap<String, String>) -> Vec<String> {
        self.definition
            .required_tags
            .iter()
            .filter(|required| {
                tags.get(required.as_str())
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Whether the validity window satisfies this kind's expiration policy
    pub fn is_expiration_allowed(
        &self,
        not_before: Option<DateTime<Utc>>,
        expires: Option<DateTime<Utc>>,
    ) -> bool {
        if let (Some(start), Some(end)) = (not_before, expires) {
            if end < start {
                return false;
            }
        }

        match self.definition.max_expiration_days {
            None => true,
            Some(days) => match expires {
                None => false,
                Some(end) => {
                    let start = not_before.unwrap_or_else(Utc::now);
                    end - start <= Duration::days(days)
                }
            },
        }
    }
}

impl Default for SecretKind {
    fn default() -> Self {
        let definition = custom_definition();
        Self {
            name_regex: Regex::new(&definition.name_regex).expect("default name regex is valid"),
            value_regex: Regex::new(&definition.value_regex)
                .expect("default value regex is valid"),
            definition,
        }
    }
}

impl PartialEq for SecretKind {
    fn eq(&self, other: &Self) -> bool {
        self.definition.alias == other.definition.alias
    }
}

fn custom_definition() -> SecretKindDefinition {
    SecretKindDefinition {
        alias: DEFAULT_SECRET_KIND.to_string(),
        description: "Any secret value".to_string(),
        name_regex: default_name_regex(),
        value_regex: default_value_regex(),
        value_template: String::new(),
        max_value_length: MAX_SECRET_VALUE_LENGTH,
        required_tags: Vec::new(),
        max_expiration_days: None,
    }
}

fn builtin_definitions() -> Vec<SecretKindDefinition> {
    vec![
        custom_definition(),
        SecretKindDefinition {
            alias: "ConnectionString".to_string(),
            description: "Semicolon separated key=value connection string".to_string(),
            name_regex: default_name_regex(),
            value_regex: r"^([^=;]+=[^;]*;)*[^=;]+=[^;]*;?$".to_string(),
            value_template: "Server=;Database=;User Id=;Password=;".to_string(),
            max_value_length: MAX_SECRET_VALUE_LENGTH,
            required_tags: Vec::new(),
            max_expiration_days: None,
        },
        SecretKindDefinition {
            alias: "StorageAccountKey".to_string(),
            description: "Azure Storage account access key".to_string(),
            name_regex: r"^[0-9a-zA-Z-]{1,127}$".to_string(),
            value_regex: r"^[A-Za-z0-9+/]{86}==$".to_string(),
            value_template: String::new(),
            max_value_length: 88,
            required_tags: Vec::new(),
            max_expiration_days: Some(365),
        },
        SecretKindDefinition {
            alias: "Password".to_string(),
            description: "Account password owned by a named person or team".to_string(),
            name_regex: default_name_regex(),
            value_regex: r"^\S{12,}$".to_string(),
            value_template: String::new(),
            max_value_length: 256,
            required_tags: vec!["owner".to_string()],
            max_expiration_days: Some(90),
        },
    ]
}

#[derive(Tabled)]
struct SecretKindRow {
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Required Tags")]
    required_tags: String,
    #[tabled(rename = "Max Expiration")]
    max_expiration: String,
}

/// Known secret kinds, looked up by alias
#[derive(Debug, Clone)]
pub struct SecretKindRegistry {
    kinds: Vec<SecretKind>,
}

impl Default for SecretKindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SecretKindRegistry {
    pub fn builtin() -> Self {
        Self {
            kinds: SecretKind::builtin(),
        }
    }

    /// Built-in kinds plus definitions from a JSON array file.
    ///
    /// A definition whose alias matches an existing kind replaces it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        let Some(path) = path else {
            return Ok(registry);
        };
        if !path.exists() {
            debug!("secret kinds file {} not found, using built-ins", path.display());
            return Ok(registry);
        }

        let contents = std::fs::read_to_string(path)?;
        let definitions: Vec<SecretKindDefinition> = serde_json::from_str(&contents)?;
        for definition in definitions {
            registry.insert(SecretKind::compile(definition)?);
        }
        debug!("loaded {} secret kinds from {}", registry.kinds.len(), path.display());
        Ok(registry)
    }

    pub fn insert(&mut self, kind: SecretKind) {
        match self
            .kinds
            .iter_mut()
            .find(|existing| existing.alias().eq_ignore_ascii_case(kind.alias()))
        {
            Some(existing) => *existing = kind,
            None => self.kinds.push(kind),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&SecretKind> {
        self.kinds
            .iter()
            .find(|kind| kind.alias().eq_ignore_ascii_case(alias))
    }

    pub fn default_kind(&self) -> SecretKind {
        self.get(DEFAULT_SECRET_KIND).cloned().unwrap_or_default()
    }

    /// Kind for an optional alias, falling back to the default kind
    pub fn resolve(&self, alias: Option<&str>) -> SecretKind {
        match alias {
            None => self.default_kind(),
            Some(alias) => self.get(alias).cloned().unwrap_or_else(|| {
                warn!("unknown secret kind '{}', using {}", alias, DEFAULT_SECRET_KIND);
                self.default_kind()
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecretKind> {
        self.kinds.iter()
    }

    pub fn to_table(&self) -> tabled::Table {
        let rows: Vec<SecretKindRow> = self
            .kinds
            .iter()
            .map(|kind| SecretKindRow {
                alias: kind.alias().to_string(),
                description: kind.description().to_string(),
                required_tags: kind.required_tags().join(", "),
                max_expiration: kind
                    .max_expiration_days()
                    .map(|days| format!("{days} days"))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        tabled::Table::new(rows)
    }
}
