use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const READWISE_LIST_URL: &str = "https://readwise.io/api/v3/list/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Pause before every list request. Reader rate limits the list endpoint.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Only fetch documents in this location (e.g. "archive").
    #[serde(default)]
    pub location_filter: Option<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readwise-stats");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
        .join("readwise-stats.db")
        .to_string_lossy()
        .to_string()
}

fn default_api_url() -> String {
    READWISE_LIST_URL.to_string()
}

fn default_request_delay_ms() -> u64 {
    3500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_url: default_api_url(),
            request_delay_ms: default_request_delay_ms(),
            location_filter: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readwise-stats")
            .join("config.toml")
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
