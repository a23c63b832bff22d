//! Table formatting for the resolved configuration

use crate::config::{InstallConfig, Secret};
use crate::error::Result;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Tabled)]
pub struct ConfigItem {
    #[tabled(rename = "Setting")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// One row per parameter, secrets masked
pub fn config_items(config: &InstallConfig) -> Result<Vec<ConfigItem>> {
    Ok(config
        .vars()?
        .into_iter()
        .map(|(key, value)| {
            let value = if InstallConfig::is_secret(&key) {
                Secret::masked().to_string()
            } else if value.is_empty() {
                "<not set>".to_string()
            } else {
                value
            };
            ConfigItem { key, value }
        })
        .collect())
}

pub fn format_config_table(config: &InstallConfig) -> Result<String> {
    let mut table = Table::new(config_items(config)?);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Padding::new(1, 1, 0, 0));
    Ok(table.to_string())
}
