//! Backend adapter contract consumed by the migration engine.
//!
//! A [`Backend`] knows how to reach one target database. Connecting yields a
//! [`Session`], which owns the single live connection for a run and bundles
//! history bookkeeping ([`HistoryStore`]), raw script execution
//! ([`ScriptRunner`]), and transaction control.

use crate::error::DbResult;
use dbe_core::{HistoryEntry, ScriptFile};
use std::time::Duration;

/// Options applied when opening a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Per-command timeout; `None` disables it.
    pub command_timeout: Option<Duration>,
}

impl ConnectOptions {
    /// Build options from a timeout in seconds, where 0 means no timeout.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            command_timeout: (secs > 0).then_some(Duration::from_secs(secs)),
        }
    }
}

/// Entry point for one database engine.
pub trait Backend {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// The database this backend points at
    fn target(&self) -> &str;

    /// Create the target database if it does not exist yet.
    ///
    /// Returns `true` when the database was created by this call.
    fn ensure_database_exists(&self) -> DbResult<bool>;

    /// Open the connection used for the rest of the run.
    fn connect(&self, options: &ConnectOptions) -> DbResult<Box<dyn Session>>;
}

/// Reads and writes the version history table.
pub trait HistoryStore {
    /// Create the history table if absent. Returns `true` when created.
    fn ensure_history_table(&self, table: &str) -> DbResult<bool>;

    /// All recorded entries, ascending by version.
    fn list_applied_entries(&self, table: &str) -> DbResult<Vec<HistoryEntry>>;

    /// Highest recorded version, or 0 when the table is empty.
    fn current_version(&self, table: &str) -> DbResult<u32>;

    /// Insert the history row for `script`, stamped with the current UTC time.
    ///
    /// Runs on the session connection, so it is part of the open transaction
    /// when there is one.
    fn record_entry(&self, table: &str, script: &ScriptFile) -> DbResult<()>;
}

/// Executes raw script batches.
pub trait ScriptRunner {
    /// Execute one batch of SQL (possibly several statements).
    ///
    /// Failures surface as [`DbError::ScriptExecution`](crate::DbError::ScriptExecution)
    /// and are never retried.
    fn execute(&self, sql: &str) -> DbResult<()>;
}

/// A live connection to the target database.
pub trait Session: HistoryStore + ScriptRunner {
    /// Start a transaction.
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction.
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction.
    fn rollback(&self) -> DbResult<()>;

    /// Check if a table or view exists (for tests)
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Execute query returning row count (for tests)
    fn query_count(&self, sql: &str) -> DbResult<usize>;
}
