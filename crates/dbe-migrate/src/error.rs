//! Error types for the migration engine.

use crate::engine::EngineState;
use dbe_core::CoreError;
use dbe_db::DbError;
use thiserror::Error;

/// Migration run errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A history entry has no matching script on disk (M001).
    #[error("[M001] Script file {path} (version {version}) recorded in the version history does not exist in the scripts directory")]
    ScriptNotFound { version: u32, path: String },

    /// An applied script's content changed after it was applied (M002).
    #[error("[M002] Script file {path} (version {version}) has been modified since it was applied to the database (recorded sha256 {recorded}, current {current})")]
    ScriptModified {
        version: u32,
        path: String,
        recorded: String,
        current: String,
    },

    /// A script batch failed; its transaction was rolled back (M003).
    #[error("[M003] Script {path} (version {version}) failed")]
    ScriptFailed {
        version: u32,
        path: String,
        #[source]
        source: DbError,
    },

    /// A pending script changed between discovery and execution (M004).
    #[error("[M004] Script {path} changed on disk while the migration was running")]
    ScriptChanged { path: String },

    /// Script path does not fit the history table (M005).
    #[error("[M005] Script path is {len} characters but the version history allows at most {max}: {path}")]
    PathTooLong { path: String, len: usize, max: usize },

    /// Engine operation called out of order (M006).
    #[error("[M006] Cannot {operation} while the migration engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },

    /// Script discovery or naming failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Backend failure outside script execution.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl MigrateError {
    /// Whether the error reports drift between history and the scripts directory.
    pub fn is_drift(&self) -> bool {
        matches!(
            self,
            MigrateError::ScriptNotFound { .. } | MigrateError::ScriptModified { .. }
        )
    }
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
