//! Configuration management for the agent

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Command prefix, e.g. "!"
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// User id of the process owner (bypasses every gate check)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<u64>,
    /// Directory holding the JSON store files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let prefix = std::env::var("CORVID_PREFIX").unwrap_or_else(|_| default_prefix());

        let owner_id = match std::env::var("CORVID_OWNER_ID") {
            Ok(raw) => Some(
                raw.parse()
                    .with_context(|| format!("CORVID_OWNER_ID is not a user id: {}", raw))?,
            ),
            Err(_) => None,
        };

        let data_dir = std::env::var("CORVID_DATA_DIR").unwrap_or_else(|_| default_data_dir());

        Ok(Config {
            prefix,
            owner_id,
            data_dir,
        })
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}
