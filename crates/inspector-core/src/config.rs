//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/inspector/config.toml)
//! 3. Environment variables (INSPECTOR_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::search::DEFAULT_SEARCH_LIMIT;

/// Environment variable prefix
const ENV_PREFIX: &str = "INSPECTOR";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Time budget for one query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Time budget for one search
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Maximum number of search results
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Log filter level for the inspector crates
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind: default_bind(),
            query_timeout_ms: default_query_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            search_limit: default_search_limit(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (INSPECTOR_DATA_DIR, INSPECTOR_BIND, ...)
    /// 2. Config file (~/.config/inspector/config.toml or INSPECTOR_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when given (e.g. `--config`), else the default location
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "Config file not found: {:?}", path);
                Self::load_from_path(path)
            }
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = env_var("BIND") {
            self.bind = val;
        }
        if let Some(val) = env_var("QUERY_TIMEOUT_MS") {
            self.query_timeout_ms = parse_env("QUERY_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = env_var("SEARCH_TIMEOUT_MS") {
            self.search_timeout_ms = parse_env("SEARCH_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = env_var("SEARCH_LIMIT") {
            self.search_limit = parse_env("SEARCH_LIMIT", &val)?;
        }
        if let Some(val) = env_var("LOG_LEVEL") {
            self.log_level = val;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with INSPECTOR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inspector")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("inspector.db")
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Render as TOML, as shown by `inspector config show`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn parse_env<T>(suffix: &str, val: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    val.trim()
        .parse()
        .with_context(|| format!("Invalid {}_{} value: {:?}", ENV_PREFIX, suffix, val))
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inspector")
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_search_timeout_ms() -> u64 {
    5_000
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}
