//! Migration engine.
//!
//! [`MigrationEngine`] owns one backend, the session opened from it, and the
//! run observer. A run walks through
//! `Uninitialized → Initialized → Validated → Applying → Done`; any failure
//! moves the engine to `Failed`, which accepts no further operations.
//!
//! Validation always precedes application, so an edited or deleted script is
//! reported before any new SQL touches the database.

use crate::error::{MigrateError, MigrateResult};
use crate::framing::FramedScript;
use crate::observer::{LogObserver, MigrationObserver};
use crate::report::{
    AppliedScript, RunReport, ScriptState, ScriptStatus, SkipReason, SkippedScript,
};
use crate::transaction::ScriptTransaction;
use dbe_core::{
    decode_script_text, list_scripts, ContentHash, HistoryEntry, ScriptFile, DEFAULT_HISTORY_TABLE,
    MAX_HISTORY_PATH_LEN,
};
use dbe_db::{Backend, ConnectOptions, Session};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// Lifecycle of a [`MigrationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Validated,
    Applying,
    Done,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::Validated => "validated",
            EngineState::Applying => "applying",
            EngineState::Done => "done",
            EngineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Engine settings that are not tied to one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Name of the version history table
    pub history_table: String,

    /// Per-command timeout in seconds (0 disables it)
    pub command_timeout_secs: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            command_timeout_secs: 30,
        }
    }
}

/// Applies pending scripts from a directory to one target database.
pub struct MigrationEngine {
    backend: Box<dyn Backend>,
    options: EngineOptions,
    observer: Box<dyn MigrationObserver>,
    session: Option<Box<dyn Session>>,
    state: EngineState,
}

impl MigrationEngine {
    /// Create an engine that reports to a [`LogObserver`].
    pub fn new(backend: Box<dyn Backend>, options: EngineOptions) -> Self {
        Self {
            backend,
            options,
            observer: Box::new(LogObserver),
            session: None,
            state: EngineState::Uninitialized,
        }
    }

    /// Replace the run observer.
    pub fn with_observer(mut self, observer: Box<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The open session, once [`initialize`](Self::initialize) succeeded.
    pub fn session(&self) -> Option<&dyn Session> {
        self.session.as_deref()
    }

    /// Create the database if needed, connect, and ensure the history table.
    pub fn initialize(&mut self) -> MigrateResult<()> {
        self.expect_state("initialize", &[EngineState::Uninitialized])?;

        let result = self.open_session();
        self.settle(result, EngineState::Initialized)
    }

    /// Check every history entry against the scripts in `scripts_dir`.
    ///
    /// Fails with [`MigrateError::ScriptNotFound`] when an applied script is
    /// gone and [`MigrateError::ScriptModified`] when its content changed.
    pub fn validate_scripts(&mut self, scripts_dir: &Path) -> MigrateResult<()> {
        self.expect_state(
            "validate scripts",
            &[
                EngineState::Initialized,
                EngineState::Validated,
                EngineState::Done,
            ],
        )?;

        let result = self.check_history(scripts_dir);
        self.settle(result, EngineState::Validated)
    }

    /// Apply every pending script in version order.
    ///
    /// Scripts at or below the current database version, or above a non-zero
    /// `ceiling`, are skipped. The first failing script is rolled back and
    /// stops the run; scripts committed before it stay applied.
    ///
    /// Every run needs a fresh [`validate_scripts`](Self::validate_scripts),
    /// including a second run on an engine that is already `Done`.
    pub fn run_scripts(&mut self, scripts_dir: &Path, ceiling: u32) -> MigrateResult<RunReport> {
        self.expect_state("run scripts", &[EngineState::Validated])?;

        self.state = EngineState::Applying;
        let result = self.apply_pending(scripts_dir, ceiling);
        self.settle(result, EngineState::Done)
    }

    /// Initialize, validate, and run in one call.
    pub fn evolve(&mut self, scripts_dir: &Path, ceiling: u32) -> MigrateResult<RunReport> {
        self.initialize()?;
        self.validate_scripts(scripts_dir)?;
        self.run_scripts(scripts_dir, ceiling)
    }

    /// Compare the scripts directory with the version history without
    /// changing anything.
    pub fn status(&self, scripts_dir: &Path) -> MigrateResult<Vec<ScriptStatus>> {
        let session = self.require_session("report status")?;
        let table = self.options.history_table.as_str();

        let applied = session.list_applied_entries(table)?;
        let current = session.current_version(table)?;
        let scripts = list_scripts(scripts_dir)?;
        Ok(script_statuses(&scripts, &applied, current))
    }

    fn expect_state(&self, operation: &'static str, allowed: &[EngineState]) -> MigrateResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MigrateError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Move to `next` on success and to `Failed` on error.
    fn settle<T>(&mut self, result: MigrateResult<T>, next: EngineState) -> MigrateResult<T> {
        self.state = if result.is_ok() {
            next
        } else {
            EngineState::Failed
        };
        result
    }

    fn require_session(&self, operation: &'static str) -> MigrateResult<&dyn Session> {
        self.session.as_deref().ok_or(MigrateError::InvalidState {
            operation,
            state: self.state,
        })
    }

    fn open_session(&mut self) -> MigrateResult<()> {
        let backend = self.backend.as_ref();
        log::debug!(
            "Checking target database {} ({})",
            backend.target(),
            backend.db_type()
        );
        let created_database = backend.ensure_database_exists()?;

        let options = ConnectOptions::with_timeout_secs(self.options.command_timeout_secs);
        let session = backend.connect(&options)?;

        log::debug!("Checking existence of {} table", self.options.history_table);
        let created_table = session.ensure_history_table(&self.options.history_table)?;

        self.observer.initialized(
            backend.db_type(),
            backend.target(),
            created_database,
            created_table,
        );
        self.session = Some(session);
        Ok(())
    }

    fn check_history(&mut self, scripts_dir: &Path) -> MigrateResult<()> {
        let session = self.require_session("validate scripts")?;
        let applied = session.list_applied_entries(&self.options.history_table)?;
        let scripts = list_scripts(scripts_dir)?;

        let by_path: HashMap<&str, &ScriptFile> =
            scripts.iter().map(|s| (s.path(), s)).collect();

        for entry in &applied {
            let Some(script) = by_path.get(entry.path.as_str()) else {
                return Err(MigrateError::ScriptNotFound {
                    version: entry.version,
                    path: entry.path.clone(),
                });
            };
            if script.content_hash() != &entry.content_hash {
                return Err(MigrateError::ScriptModified {
                    version: entry.version,
                    path: entry.path.clone(),
                    recorded: entry.content_hash.to_hex(),
                    current: script.content_hash().to_hex(),
                });
            }
        }

        self.observer.validated(applied.len());
        Ok(())
    }

    fn apply_pending(&mut self, scripts_dir: &Path, ceiling: u32) -> MigrateResult<RunReport> {
        let Self {
            session,
            observer,
            options,
            state,
            ..
        } = self;
        let session = session.as_deref().ok_or(MigrateError::InvalidState {
            operation: "run scripts",
            state: *state,
        })?;
        let table = options.history_table.as_str();

        let scripts = list_scripts(scripts_dir)?;
        let current = session.current_version(table)?;
        let mut report = RunReport::new(current);

        for script in &scripts {
            if let Some(reason) = SkipReason::for_version(script.version(), current, ceiling) {
                observer.script_skipped(script, &reason);
                report.skipped.push(SkippedScript::new(script, reason));
                continue;
            }

            let started = Instant::now();
            match apply_script(session, table, script, &mut **observer) {
                Ok((transactional, batches)) => {
                    let elapsed = started.elapsed();
                    observer.script_applied(script, elapsed);
                    report.applied.push(AppliedScript {
                        version: script.version(),
                        path: script.path().to_string(),
                        transactional,
                        batches,
                        duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    });
                    report.final_version = script.version();
                }
                Err(e) => {
                    observer.script_failed(script, &e);
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}

/// Run one script and record it. Returns whether it ran in a transaction and
/// how many batches it had.
fn apply_script(
    session: &dyn Session,
    table: &str,
    script: &ScriptFile,
    observer: &mut dyn MigrationObserver,
) -> MigrateResult<(bool, usize)> {
    let len = script.path().chars().count();
    if len > MAX_HISTORY_PATH_LEN {
        return Err(MigrateError::PathTooLong {
            path: script.path().to_string(),
            len,
            max: MAX_HISTORY_PATH_LEN,
        });
    }

    let bytes = script.read_bytes()?;
    if ContentHash::of(&bytes) != *script.content_hash() {
        return Err(MigrateError::ScriptChanged {
            path: script.path().to_string(),
        });
    }
    let text = decode_script_text(script.path(), &bytes)?;
    let framed = FramedScript::parse(&text);

    observer.script_started(script, framed.transactional);
    let transaction = ScriptTransaction::begin(session, framed.transactional)?;

    for batch in &framed.batches {
        session
            .execute(batch)
            .map_err(|source| MigrateError::ScriptFailed {
                version: script.version(),
                path: script.path().to_string(),
                source,
            })?;
    }
    session.record_entry(table, script)?;
    transaction.commit()?;

    Ok((framed.transactional, framed.batches.len()))
}

/// Join local scripts with history rows, ordered by version then path.
fn script_statuses(
    scripts: &[ScriptFile],
    applied: &[HistoryEntry],
    current: u32,
) -> Vec<ScriptStatus> {
    let by_path: HashMap<&str, &HistoryEntry> =
        applied.iter().map(|e| (e.path.as_str(), e)).collect();

    let mut rows: Vec<ScriptStatus> = scripts
        .iter()
        .map(|script| {
            let (state, applied_at) = match by_path.get(script.path()) {
                Some(entry) if entry.matches(script) => {
                    (ScriptState::Applied, Some(entry.applied_at))
                }
                Some(entry) => (ScriptState::Modified, Some(entry.applied_at)),
                None if script.version() <= current => (ScriptState::Ignored, None),
                None => (ScriptState::Pending, None),
            };
            ScriptStatus {
                version: script.version(),
                path: script.path().to_string(),
                state,
                applied_at,
            }
        })
        .collect();

    let local: HashSet<&str> = scripts.iter().map(ScriptFile::path).collect();
    rows.extend(
        applied
            .iter()
            .filter(|e| !local.contains(e.path.as_str()))
            .map(|e| ScriptStatus {
                version: e.version,
                path: e.path.clone(),
                state: ScriptState::Missing,
                applied_at: Some(e.applied_at),
            }),
    );

    rows.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));
    rows
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
