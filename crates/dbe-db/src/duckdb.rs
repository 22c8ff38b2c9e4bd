//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::history_sql::{
    create_table_sql, current_version_sql, entry_from_row, format_timestamp, insert_entry_sql,
    select_entries_sql, version_from_i64,
};
use crate::target::{create_parent_dirs, database_exists, is_memory};
use crate::traits::{Backend, ConnectOptions, HistoryStore, ScriptRunner, Session};
use chrono::Utc;
use dbe_core::{HistoryEntry, ScriptFile};
use duckdb::Connection;
use std::path::Path;

/// DuckDB backend pointing at a database file (or `:memory:`).
pub struct DuckDbBackend {
    path: String,
}

impl DuckDbBackend {
    /// Create a backend for the database at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
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
        conn.execute_batch("CHECKPOINT")
            .map_err(|e| DbError::DatabaseCreation {
                target: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(true)
    }

    fn connect(&self, options: &ConnectOptions) -> DbResult<Box<dyn Session>> {
        if let Some(timeout) = options.command_timeout {
            log::debug!(
                "DuckDB has no statement timeout; ignoring command timeout of {}s",
                timeout.as_secs()
            );
        }
        let session = DuckDbSession::new(&self.path)?;
        Ok(Box::new(session))
    }
}

/// Live DuckDB connection.
///
/// Single-threaded: the engine drives one statement at a time, so no `Mutex`.
pub struct DuckDbSession {
    conn: Connection,
}

impl DuckDbSession {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if is_memory(path) {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn table_exists(&self, table: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND lower(table_name) = lower(?)",
            duckdb::params![table],
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

impl HistoryStore for DuckDbSession {
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
                &insert_entry_sql(table, "CAST(? AS TIMESTAMP)"),
                duckdb::params![
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

impl ScriptRunner for DuckDbSession {
    fn execute(&self, sql: &str) -> DbResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DbError::ScriptExecution {
                sql: sql.to_string(),
                message: e.to_string(),
            })
    }
}

impl Session for DuckDbSession {
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
        // Handle schema-qualified names
        let (schema, table) = if let Some(pos) = name.rfind('.') {
            (&name[..pos], &name[pos + 1..])
        } else {
            ("main", name)
        };

        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            duckdb::params![schema, table],
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
#[path = "duckdb_test.rs"]
mod tests;
