use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};
use crate::view::{SortKey, StatusFilter};

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "TODUST_DIR";
/// Overrides the config file location.
pub const CONFIG_ENV: &str = "TODUST_CONFIG";
/// Log filter, in `tracing_subscriber::EnvFilter` syntax.
pub const LOG_ENV: &str = "TODUST_LOG";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding `tasks.json`, `templates.json` and friends.
    pub data_dir: Option<PathBuf>,
    pub default_sort: SortKey,
    pub default_filter: StatusFilter,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            default_sort: SortKey::Created,
            default_filter: StatusFilter::All,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Reads the config file if there is one, otherwise returns defaults.
    pub fn load() -> Result<Config> {
        let path = config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path)?;
        Self::parse(&raw).map_err(|e| TodoError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(raw: &str) -> std::result::Result<Config, toml::de::Error> {
        toml::from_str(raw)
    }

    /// The data directory, determined in the following order:
    /// 1. `TODUST_DIR` environment variable.
    /// 2. `data_dir` from the config file.
    /// 3. `~/.local/share/todust` (on Linux).
    /// 4. `./todust` (fallback).
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("todust");
        p
    }
}

/// `TODUST_CONFIG`, else `<config_dir>/todust/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("todust");
    p.push("config.toml");
    p
}
