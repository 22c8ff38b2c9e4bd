//! Error types for dbe-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Target database could not be created (D002)
    #[error("[D002] Failed to create database {target}: {message}")]
    DatabaseCreation { target: String, message: String },

    /// Query execution error (D003)
    #[error("[D003] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Script batch failed; carries the SQL that was sent (D004)
    #[error("[D004] Script execution failed: {message}\n--- SQL ---\n{sql}")]
    ScriptExecution { sql: String, message: String },

    /// Transaction management error (D005)
    #[error("[D005] Transaction failed: {0}")]
    TransactionError(String),

    /// History table contains a row that cannot be read back (D006)
    #[error("[D006] Corrupt version history in {table}: {message}")]
    CorruptHistory { table: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
