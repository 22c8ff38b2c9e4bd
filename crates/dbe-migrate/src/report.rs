//! Run reports and script status rows.

use chrono::{DateTime, Utc};
use dbe_core::ScriptFile;
use serde::Serialize;
use std::fmt;

/// Why a script was not applied in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Version is at or below the database's current version
    AlreadyApplied { current: u32 },
    /// Version is above the requested ceiling
    AboveCeiling { ceiling: u32 },
}

impl SkipReason {
    /// Decide whether `version` is outside the upgrade range.
    ///
    /// A `ceiling` of 0 means no ceiling.
    pub fn for_version(version: u32, current: u32, ceiling: u32) -> Option<Self> {
        if version <= current {
            Some(SkipReason::AlreadyApplied { current })
        } else if ceiling != 0 && version > ceiling {
            Some(SkipReason::AboveCeiling { ceiling })
        } else {
            None
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyApplied { current } => {
                write!(f, "database is already at version {current}")
            }
            SkipReason::AboveCeiling { ceiling } => {
                write!(f, "above the maximum version {ceiling}")
            }
        }
    }
}

/// A script applied during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedScript {
    pub version: u32,
    pub path: String,
    pub transactional: bool,
    pub batches: usize,
    pub duration_ms: u64,
}

/// A script left untouched during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedScript {
    pub version: u32,
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl SkippedScript {
    pub(crate) fn new(script: &ScriptFile, reason: SkipReason) -> Self {
        Self {
            version: script.version(),
            path: script.path().to_string(),
            reason,
        }
    }
}

/// Outcome of [`MigrationEngine::run_scripts`](crate::MigrationEngine::run_scripts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Database version before the run
    pub starting_version: u32,
    /// Database version after the run
    pub final_version: u32,
    pub applied: Vec<AppliedScript>,
    pub skipped: Vec<SkippedScript>,
}

impl RunReport {
    pub(crate) fn new(starting_version: u32) -> Self {
        Self {
            starting_version,
            final_version: starting_version,
            applied: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Versions applied, in order.
    pub fn applied_versions(&self) -> Vec<u32> {
        self.applied.iter().map(|a| a.version).collect()
    }
}

/// Where a script stands relative to the version history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptState {
    /// Recorded with a matching hash
    Applied,
    /// Recorded, but the file content changed since
    Modified,
    /// Recorded, but no such file in the scripts directory
    Missing,
    /// Above the current version; the next run applies it
    Pending,
    /// Never recorded but at or below the current version, so never applied
    Ignored,
}

impl fmt::Display for ScriptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptState::Applied => "applied",
            ScriptState::Modified => "modified",
            ScriptState::Missing => "missing",
            ScriptState::Pending => "pending",
            ScriptState::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// One row of [`MigrationEngine::status`](crate::MigrationEngine::status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStatus {
    pub version: u32,
    pub path: String,
    pub state: ScriptState,
    pub applied_at: Option<DateTime<Utc>>,
}
