//! Configuration types and parsing for dbevolve.yml

use crate::error::{CoreError, CoreResult};
use crate::history::DEFAULT_HISTORY_TABLE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names probed by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["dbevolve.yml", "dbevolve.yaml"];

/// Migration run configuration from dbevolve.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory containing the migration scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Name of the version history table
    #[serde(default = "default_history_table")]
    pub history_table: String,

    /// Highest version to apply (0 = no ceiling)
    #[serde(default)]
    pub max_version: u32,

    /// Per-command timeout in seconds (0 disables the timeout)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// SQLite
    Sqlite,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or sqlite)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            scripts_dir: default_scripts_dir(),
            history_table: default_history_table(),
            max_version: 0,
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

/// Path that denotes a private in-memory database.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_DB_PATH: &str = "dbevolve.duckdb";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_scripts_dir() -> String {
    "dbscripts".to_string()
}

fn default_history_table() -> String {
    DEFAULT_HISTORY_TABLE.to_string()
}

fn default_command_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory if a config file is present.
    ///
    /// Returns `Ok(None)` when neither dbevolve.yml nor dbevolve.yaml exists.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Option<Self>> {
        match Self::find_in_dir(dir) {
            Some(path) => Self::load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// First config file found in `dir`.
    pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.history_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "history_table cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.scripts_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "scripts_dir cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Scripts directory resolved against `root` when relative.
    pub fn scripts_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.scripts_dir)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
