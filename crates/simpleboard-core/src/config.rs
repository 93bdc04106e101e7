//! Application configuration management.
//!
//! Configuration is stored at `~/.config/simpleboard/config.json` and holds
//! the API base URL, the app environment and the last email used to log in.
//! `SIMPLEBOARD_API_BASE_URL` and `SIMPLEBOARD_APP_ENV` override the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "simpleboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session storage file name in the cache directory
const STORAGE_FILE: &str = "storage.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

pub const API_BASE_URL_ENV: &str = "SIMPLEBOARD_API_BASE_URL";
pub const APP_ENV_ENV: &str = "SIMPLEBOARD_APP_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub app_env: AppEnv,
    pub last_email: Option<String>,
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(env) = lookup(APP_ENV_ENV) {
            self.app_env = AppEnv::parse(&env);
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn is_prod(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Where the persistent session storage lives.
    pub fn storage_path(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(STORAGE_FILE))
    }
}
