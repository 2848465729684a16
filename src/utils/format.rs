//! Table formatting and output utilities
//!
//! Listings render as tables, JSON or YAML. Status lines are colored with
//! crossterm unless color is turned off.

use crate::error::{Result, VaultEditError};
use clap::ValueEnum;
use crossterm::{
    style::{Color as CrosstermColor, Stylize},
    terminal::size,
};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style, Width},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Raw,
}

/// Color theme for console output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub header: CrosstermColor,
    pub success: CrosstermColor,
    pub warning: CrosstermColor,
    pub error: CrosstermColor,
    pub info: CrosstermColor,
    pub accent: CrosstermColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            header: CrosstermColor::Blue,
            success: CrosstermColor::Green,
            warning: CrosstermColor::Yellow,
            error: CrosstermColor::Red,
            info: CrosstermColor::Cyan,
            accent: CrosstermColor::Magenta,
        }
    }
}

/// Table formatter with color support
pub struct TableFormatter {
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    /// Render rows in the configured format
    pub fn format_table<T: Tabled + Serialize>(&self, data: &[T]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(data).map_err(Into::into),
            OutputFormat::Yaml => serde_yaml::to_string(data)
                .map_err(|e| VaultEditError::serialization(e.to_string())),
            OutputFormat::Table if data.is_empty() => Ok("No items to display".to_string()),
            OutputFormat::Table => Ok(format_table(Table::new(data), self.no_color)),
            OutputFormat::Raw => {
                let mut table = Table::new(data);
                table.with(Style::empty());
                Ok(table.to_string())
            }
        }
    }
}

/// Display utilities for status lines and details
pub struct DisplayUtils {
    theme: ColorTheme,
    no_color: bool,
}

impl DisplayUtils {
    pub fn new(no_color: bool) -> Self {
        Self {
            theme: ColorTheme::default(),
            no_color,
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.no_color {
            println!("=== {} ===", title);
        } else {
            println!("=== {} ===", title.with(self.theme.header).bold());
        }
    }

    pub fn print_success(&self, message: &str) {
        if self.no_color {
            println!("✓ {}", message);
        } else {
            println!("✓ {}", message.with(self.theme.success));
        }
    }

    pub fn print_warning(&self, message: &str) {
        if self.no_color {
            eprintln!("⚠ {}", message);
        } else {
            eprintln!("⚠ {}", message.with(self.theme.warning));
        }
    }

    pub fn print_error(&self, message: &str) {
        if self.no_color {
            eprintln!("✗ {}", message);
        } else {
            eprintln!("✗ {}", message.with(self.theme.error));
        }
    }

    pub fn print_info(&self, message: &str) {
        if self.no_color {
            println!("ℹ {}", message);
        } else {
            println!("ℹ {}", message.with(self.theme.info));
        }
    }

    /// Format key-value pairs with aligned keys
    pub fn format_key_value_pairs(&self, pairs: &[(&str, String)]) -> String {
        let max_key_length = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        pairs
            .iter()
            .map(|(key, value)| {
                let padded = format!("{:width$}", key, width = max_key_length);
                if self.no_color {
                    format!("{}: {}", padded, value)
                } else {
                    format!("{}: {}", padded.with(self.theme.accent).bold(), value)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Apply the standard table style, wrapping to the terminal width
pub fn format_table(mut table: Table, no_color: bool) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Padding::new(1, 1, 0, 0));

    if !no_color {
        table.with(Modify::new(Rows::first()).with(Color::FG_BLUE));
    }

    if let Ok((width, _)) = size() {
        table.with(Width::wrap(width as usize));
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct TestData {
        name: String,
        status: String,
    }

    fn rows() -> Vec<TestData> {
        vec![
            TestData {
                name: "db-password".to_string(),
                status: "enabled".to_string(),
            },
            TestData {
                name: "api-key".to_string(),
                status: "disabled".to_string(),
            },
        ]
    }

    #[test]
    fn test_table_formatting() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let result = formatter.format_table(&rows()).unwrap();
        assert!(result.contains("db-password"));
        assert!(result.contains("status"));
    }

    #[test]
    fn test_json_and_yaml_formatting() {
        let json = TableFormatter::new(OutputFormat::Json, true)
            .format_table(&rows())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[1]["name"], "api-key");

        let yaml = TableFormatter::new(OutputFormat::Yaml, true)
            .format_table(&rows())
            .unwrap();
        assert!(yaml.contains("name: db-password"));
    }

    #[test]
    fn test_empty_table_message() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let empty: Vec<TestData> = Vec::new();
        assert_eq!(formatter.format_table(&empty).unwrap(), "No items to display");
    }

    #[test]
    fn test_key_value_formatting() {
        let display = DisplayUtils::new(true);
        let pairs = vec![
            ("Name", "db-password".to_string()),
            ("Content Type", "text/plain".to_string()),
        ];

        let result = display.format_key_value_pairs(&pairs);
        assert!(result.contains("Name        : db-password"));
        assert!(result.contains("Content Type: text/plain"));
    }
}
