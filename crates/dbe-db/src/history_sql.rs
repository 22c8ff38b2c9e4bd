//! SQL text and row conversion for the version history table.
//!
//! DuckDB and SQLite accept the same DDL and `?` placeholders here, so both
//! adapters share these statements. Timestamps travel as text in
//! [`TIMESTAMP_FORMAT`].

use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use dbe_core::{ContentHash, HistoryEntry, MAX_HISTORY_PATH_LEN};

/// Text form of `applied_at` (UTC, microsecond precision).
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Quote `name` as a SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (
             version      INTEGER NOT NULL PRIMARY KEY,
             path         VARCHAR({}) NOT NULL,
             content_hash BLOB NOT NULL,
             applied_at   TIMESTAMP NOT NULL
         )",
        quote_ident(table),
        MAX_HISTORY_PATH_LEN
    )
}

pub(crate) fn select_entries_sql(table: &str) -> String {
    format!(
        "SELECT version, path, content_hash, CAST(applied_at AS VARCHAR) FROM {} ORDER BY version",
        quote_ident(table)
    )
}

pub(crate) fn current_version_sql(table: &str) -> String {
    format!(
        "SELECT COALESCE(MAX(version), 0) FROM {}",
        quote_ident(table)
    )
}

/// `applied_at` is bound through `timestamp_param`: DuckDB needs an explicit
/// cast, while SQLite must store the text as-is (a cast to TIMESTAMP there has
/// NUMERIC affinity and would truncate to the year).
pub(crate) fn insert_entry_sql(table: &str, timestamp_param: &str) -> String {
    format!(
        "INSERT INTO {} (version, path, content_hash, applied_at) VALUES (?, ?, ?, {})",
        quote_ident(table),
        timestamp_param
    )
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Assemble a [`HistoryEntry`] from raw column values.
pub(crate) fn entry_from_row(
    table: &str,
    version: i64,
    path: String,
    hash: Vec<u8>,
    applied_at: String,
) -> DbResult<HistoryEntry> {
    let corrupt = |message: String| DbError::CorruptHistory {
        table: table.to_string(),
        message,
    };

    let version = u32::try_from(version)
        .map_err(|_| corrupt(format!("version {version} is out of range")))?;
    let content_hash = ContentHash::from_slice(&hash).ok_or_else(|| {
        corrupt(format!(
            "content hash for version {version} is {} bytes, expected 32",
            hash.len()
        ))
    })?;
    let applied_at = NaiveDateTime::parse_from_str(applied_at.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| corrupt(format!("applied_at '{applied_at}' for version {version}: {e}")))?
        .and_utc();

    Ok(HistoryEntry {
        version,
        path,
        content_hash,
        applied_at,
    })
}

/// Convert a `MAX(version)` result.
pub(crate) fn version_from_i64(table: &str, version: i64) -> DbResult<u32> {
    u32::try_from(version).map_err(|_| DbError::CorruptHistory {
        table: table.to_string(),
        message: format!("version {version} is out of range"),
    })
}
