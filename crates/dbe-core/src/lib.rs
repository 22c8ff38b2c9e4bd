//! dbe-core - Core library for dbevolve
//!
//! This crate provides the script naming convention, script discovery,
//! content fingerprints, version history records, and configuration parsing
//! shared by the backend adapters, the migration engine, and the CLI.

pub mod checksum;
pub mod config;
pub mod error;
pub mod history;
pub mod repository;
pub mod script;
pub mod script_name;

pub use checksum::{ContentHash, CONTENT_HASH_LEN};
pub use config::{Config, DatabaseConfig, DbType, MEMORY_DB_PATH};
pub use error::{CoreError, CoreResult};
pub use history::{HistoryEntry, DEFAULT_HISTORY_TABLE, MAX_HISTORY_PATH_LEN};
pub use repository::list_scripts;
pub use script::{decode_script_text, ScriptFile};
pub use script_name::{parse_script_name, parse_script_path, parse_version_label};
