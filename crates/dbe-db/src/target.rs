//! Helpers for file-backed database targets.

use crate::error::{DbError, DbResult};
use dbe_core::MEMORY_DB_PATH;
use std::path::Path;

/// Whether `path` names a private in-memory database.
pub(crate) fn is_memory(path: &str) -> bool {
    path == MEMORY_DB_PATH
}

/// Whether the database file at `path` is already there.
///
/// In-memory targets always exist.
pub(crate) fn database_exists(path: &str) -> bool {
    is_memory(path) || Path::new(path).exists()
}

/// Create the parent directories of a database file.
pub(crate) fn create_parent_dirs(path: &str) -> DbResult<()> {
    let Some(parent) = Path::new(path).parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|e| DbError::DatabaseCreation {
        target: path.to_string(),
        message: format!("failed to create {}: {e}", parent.display()),
    })
}
