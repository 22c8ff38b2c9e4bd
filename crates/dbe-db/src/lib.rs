//! dbe-db - Database adapters for dbevolve
//!
//! This crate provides the backend adapter contract used by the migration
//! engine ([`Backend`], [`Session`], [`HistoryStore`], [`ScriptRunner`]) and
//! implementations for DuckDB and SQLite.

pub mod duckdb;
pub mod error;
pub(crate) mod history_sql;
pub mod sqlite;
pub(crate) mod target;
pub mod traits;
pub(crate) mod watchdog;

pub use crate::duckdb::{DuckDbBackend, DuckDbSession};
pub use error::{DbError, DbResult};
pub use sqlite::{SqliteBackend, SqliteSession};
pub use traits::{Backend, ConnectOptions, HistoryStore, ScriptRunner, Session};

use dbe_core::{DatabaseConfig, DbType};

/// Build the backend selected by `config`.
pub fn backend_for(config: &DatabaseConfig) -> Box<dyn Backend> {
    match config.db_type {
        DbType::DuckDb => Box::new(DuckDbBackend::new(config.path.clone())),
        DbType::Sqlite => Box::new(SqliteBackend::new(config.path.clone())),
    }
}
