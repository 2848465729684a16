//! Interactive input utilities for user prompts and setup workflows

use crate::error::{Result, VaultEditError};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use zeroize::Zeroizing;

/// Interactive prompt utilities
pub struct InteractivePrompt {
    theme: ColorfulTheme,
}

impl InteractivePrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for yes/no confirmation with a default value
    pub fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| VaultEditError::config(format!("Failed to get user input: {e}")))
    }

    /// Prompt for text input; an empty answer is allowed when there is no default
    pub fn input_text(&self, message: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty(default.is_none());

        if let Some(default_value) = default {
            input = input.default(default_value.to_string());
        }

        input
            .interact_text()
            .map_err(|e| VaultEditError::config(format!("Failed to get user input: {e}")))
    }

    /// Prompt for text input with validation function
    pub fn input_text_validated<F>(
        &self,
        message: &str,
        default: Option<&str>,
        validator: F,
    ) -> Result<String>
    where
        F: Fn(&str) -> std::result::Result<(), String>,
    {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .validate_with(|input: &String| validator(input.as_str()));

        if let Some(default_value) = default {
            input = input.default(default_value.to_string());
        }

        input
            .interact_text()
            .map_err(|e| VaultEditError::config(format!("Failed to get user input: {e}")))
    }

    /// Prompt for selection from a list of options
    pub fn select(&self, message: &str, options: &[String], default: Option<usize>) -> Result<usize> {
        let mut select = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(options)
            .max_length(20);

        if let Some(default_index) = default {
            select = select.default(default_index);
        }

        select
            .interact()
            .map_err(|e| VaultEditError::config(format!("Failed to get user selection: {e}")))
    }

    /// Read a value without echoing it to the terminal
    pub fn secret_value(&self, message: &str) -> Result<Zeroizing<String>> {
        rpassword::prompt_password(format!("{message}: "))
            .map(Zeroizing::new)
            .map_err(|e| VaultEditError::invalid_argument(format!("Failed to read value: {e}")))
    }

    pub fn step(&self, step_number: u8, total_steps: u8, title: &str) {
        println!();
        println!("Step {step_number}/{total_steps}: {title}");
        println!();
    }
}

impl Default for InteractivePrompt {
    fn default() -> Self {
        Self::new()
    }
}
