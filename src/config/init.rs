//! Interactive configuration setup for `kve config init`

use crate::config::settings::{save_config, AuthMethod, Config};
use crate::error::Result;
use crate::utils::interactive::InteractivePrompt;
use regex::Regex;
use std::sync::OnceLock;

/// Answers collected during initialization
#[derive(Debug, Clone, Default)]
pub struct InitAnswers {
    pub default_vault: String,
    pub auth_method: AuthMethod,
    pub tenant_id: String,
    pub client_id: String,
    pub clipboard_timeout: u64,
}

fn vault_name_regex() -> &'static Regex {
    static VAULT_NAME: OnceLock<Regex> = OnceLock::new();
    VAULT_NAME.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{1,22}[a-zA-Z0-9]$").expect("vault name regex is valid")
    })
}

/// Key Vault names are 3-24 alphanumerics and dashes, starting with a letter
pub fn validate_vault_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || vault_name_regex().is_match(name) {
        Ok(())
    } else {
        Err("vault names are 3-24 letters, digits and dashes, starting with a letter".to_string())
    }
}

pub struct ConfigInitializer {
    prompt: InteractivePrompt,
}

impl ConfigInitializer {
    pub fn new() -> Self {
        Self {
            prompt: InteractivePrompt::new(),
        }
    }

    /// Ask for each setting, starting from `current`, and save the result
    pub async fn run_interactive_setup(&self, current: &Config) -> Result<Config> {
        println!("Setting up kve for Azure Key Vault.");

        self.prompt.step(1, 3, "Default vault");
        let default_vault = self.prompt.input_text_validated(
            "Default vault name (leave empty for none)",
            current.default_vault.as_deref(),
            validate_vault_name,
        )?;

        self.prompt.step(2, 3, "Authentication");
        let methods = vec![
            "Azure CLI / managed identity / environment (default)".to_string(),
            "Service principal with client secret".to_string(),
        ];
        let default_index = match current.auth_method {
            AuthMethod::Default => 0,
            AuthMethod::ClientSecret => 1,
        };
        let auth_method = match self.prompt.select("Authentication method", &methods, Some(default_index))? {
            1 => AuthMethod::ClientSecret,
            _ => AuthMethod::Default,
        };

        let (tenant_id, client_id) = if auth_method == AuthMethod::ClientSecret {
            println!("The client secret itself is read from AZURE_CLIENT_SECRET.");
            (
                self.prompt
                    .input_text("Tenant ID", current.tenant_id.as_deref())?,
                self.prompt
                    .input_text("Client ID", current.client_id.as_deref())?,
            )
        } else {
            (
                current.tenant_id.clone().unwrap_or_default(),
                current.client_id.clone().unwrap_or_default(),
            )
        };

        self.prompt.step(3, 3, "Clipboard");
        let timeout = self.prompt.input_text_validated(
            "Seconds before copied values are cleared (0 to keep them)",
            Some(&current.clipboard_timeout.to_string()),
            |value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map(|_| ())
                    .map_err(|_| "enter a whole number of seconds".to_string())
            },
        )?;

        let config = build_config(
            current,
            InitAnswers {
                default_vault,
                auth_method,
                tenant_id,
                client_id,
                clipboard_timeout: timeout.trim().parse().unwrap_or(current.clipboard_timeout),
            },
        );

        save_config(&config).await?;
        println!(
            "Configuration saved to {}",
            Config::get_config_path()?.display()
        );
        Ok(config)
    }
}

impl Default for ConfigInitializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge init answers into an existing configuration
pub fn build_config(current: &Config, answers: InitAnswers) -> Config {
    let non_empty = |value: String| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    };

    Config {
        default_vault: non_empty(answers.default_vault),
        auth_method: answers.auth_method,
        tenant_id: non_empty(answers.tenant_id),
        client_id: non_empty(answers.client_id),
        clipboard_timeout: answers.clipboard_timeout,
        ..current.clone()
    }
}
