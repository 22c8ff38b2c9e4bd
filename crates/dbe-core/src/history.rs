//! Version history records.

use crate::checksum::ContentHash;
use crate::script::ScriptFile;
use chrono::{DateTime, Utc};

/// Default name of the version history table.
pub const DEFAULT_HISTORY_TABLE: &str = "__Version_History__";

/// Maximum length of the `path` column in the history table.
pub const MAX_HISTORY_PATH_LEN: usize = 512;

/// One row of the version history table.
///
/// Written once when a script is applied and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Applied version
    pub version: u32,

    /// Script path at the time it was applied
    pub path: String,

    /// Content hash at the time it was applied
    pub content_hash: ContentHash,

    /// When the script was applied
    pub applied_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Whether `script` is the same file with the same content.
    pub fn matches(&self, script: &ScriptFile) -> bool {
        self.path == script.path() && &self.content_hash == script.content_hash()
    }
}
