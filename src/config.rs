//! Configuration loading
//!
//! Handles parsing of the `task_manager.toml` file. Every key is optional and
//! a missing file means "all defaults".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::view::SortBy;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "task_manager.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the task snapshot
    pub database_path: PathBuf,

    /// How long the event loop waits for input before redrawing
    pub tick_rate_ms: u64,

    /// Cosmetic delay applied to add/update/delete before they land
    pub action_delay_ms: u64,

    /// Initial sort order of the list
    pub default_sort: String,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("database.db"),
            tick_rate_ms: 250,
            action_delay_ms: 300,
            default_sort: "deadline".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Log file; the terminal itself belongs to the UI
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("task_manager.log"),
        }
    }
}

impl Config {
    /// Load the config from `path`, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_rate_ms == 0 {
            return Err(Error::InvalidConfig("tick_rate_ms must be positive".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("database_path is empty".to_string()));
        }
        Ok(())
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn default_sort(&self) -> SortBy {
        SortBy::from(self.default_sort.as_str())
    }
}
