//! SQLite database backend implementation
//!
//! Command timeouts are enforced with a [`Watchdog`] that interrupts the
//! connection, and the same timeout is used as the busy timeout so lock waits
//! are bounded too.

use crate::error::{DbError, DbResult};
use crate::history_sql::{
    create_table_sql, current_version_sql, entry_from_row, format_timestamp, insert_entry_sql,
    select_entries_sql, version_from_i64,
};
use crate::target::{create_parent_dirs, database_exists, is_memory};
use crate::traits::{Backend, ConnectOptions, HistoryStore, ScriptRunner, Session};
use crate::watchdog::Watchdog;
use chrono::Utc;
use dbe_core::{HistoryEntry, ScriptFile};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// SQLite backend pointing at a database file (or `:memory:`).
pub struct SqliteBackend {
    path: String,
}

impl SqliteBackend {
    /// Create a backend for the database at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for SqliteBackend {
    fn db_type(&self) -> &'static str {
        "sqlite"
    }

    fn target(&self) -> &str {
        &self.path
    }

    fn ensure_database_exists(&self) -> DbResult<bool> {
        if database_exists(&self.path) {
            return Ok(false);
        }

        create_parent_dirs(&self.path)?;
        let conn = Connection::open(&self.path).map_err(|e| DbError::DatabaseCreation {
            target: self.path.clone(),
            message: e.to_string(),
        })?;
        // Force the header page to disk so the file exists from here on.
        conn.execute_batch("PRAGMA user_version = 0;")
            .map_err(|e| DbError::DatabaseCreation {
                target: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(true)
    }

    fn connect(&self, options: &ConnectOptions) -> DbResult<Box<dyn Session>> {
        let mut session = SqliteSession::new(&self.path)?;
        session.set_command_timeout(options.command_timeout)?;
        Ok(Box::new(session))
    }
}

/// Live SQLite connection.
pub struct SqliteSession {
    conn: Connection,
    command_timeout: Option<Duration>,
}

impl SqliteSession {
    /// Create a new in-memory SQLite connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn,
            command_timeout: None,
        })
    }

    /// Create a new SQLite connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn,
            command_timeout: None,
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if is_memory(path) {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Set the timeout applied to every script batch and to lock waits.
    pub fn set_command_timeout(&mut self, timeout: Option<Duration>) -> DbResult<()> {
        if let Some(timeout) = timeout {
            self.conn
                .busy_timeout(timeout)
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        }
        self.command_timeout = timeout;
        Ok(())
    }

    fn table_exists(&self, table: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
            rusqlite::params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn control(&self, sql: &str) -> DbResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))
    }
}

impl HistoryStore for SqliteSession {
    fn ensure_history_table(&self, table: &str) -> DbResult<bool> {
        if self.table_exists(table)? {
            return Ok(false);
        }
        self.conn
            .execute_batch(&create_table_sql(table))
            .map_err(|e| DbError::ExecutionError(format!("failed to create {table}: {e}")))?;
        Ok(true)
    }

    fn list_applied_entries(&self, table: &str) -> DbResult<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&select_entries_sql(table))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (version, path, hash, applied_at) = row?;
            entries.push(entry_from_row(table, version, path, hash, applied_at)?);
        }
        Ok(entries)
    }

    fn current_version(&self, table: &str) -> DbResult<u32> {
        let version: i64 = self
            .conn
            .query_row(&current_version_sql(table), [], |row| row.get(0))?;
        version_from_i64(table, version)
    }

    fn record_entry(&self, table: &str, script: &ScriptFile) -> DbResult<()> {
        self.conn
            .execute(
                &insert_entry_sql(table, "?"),
                rusqlite::params![
                    i64::from(script.version()),
                    script.path(),
                    script.content_hash().as_bytes().to_vec(),
                    format_timestamp(&Utc::now()),
                ],
            )
            .map_err(|e| {
                DbError::ExecutionError(format!(
                    "failed to record version {} in {table}: {e}",
                    script.version()
                ))
            })?;
        Ok(())
    }
}

impl ScriptRunner for SqliteSession {
    fn execute(&self, sql: &str) -> DbResult<()> {
        let watchdog = self.command_timeout.map(|timeout| {
            let handle = self.conn.get_interrupt_handle();
            Watchdog::arm(timeout, move || handle.interrupt())
        });

        let result = self.conn.execute_batch(sql);
        let timed_out = watchdog.as_ref().is_some_and(Watchdog::fired);
        drop(watchdog);

        result.map_err(|e| {
            let message = match (timed_out, self.command_timeout) {
                (true, Some(timeout)) => {
                    format!("command timed out after {}s: {e}", timeout.as_secs())
                }
                _ => e.to_string(),
            };
            DbError::ScriptExecution {
                sql: sql.to_string(),
                message,
            }
        })
    }
}

impl Session for SqliteSession {
    fn begin(&self) -> DbResult<()> {
        self.control("BEGIN TRANSACTION")
    }

    fn commit(&self) -> DbResult<()> {
        self.control("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.control("ROLLBACK")
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
            rusqlite::params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn query_count(&self, sql: &str) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })?;
        usize::try_from(count)
            .map_err(|_| DbError::ExecutionError(format!("row count {count} is out of range")))
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;
