//! Run event reporting.
//!
//! The engine reports what it does to a [`MigrationObserver`] it owns for the
//! duration of one run. [`LogObserver`] forwards every event to the `log`
//! facade; callers can supply their own observer to collect or render events.

use crate::error::MigrateError;
use crate::report::SkipReason;
use dbe_core::ScriptFile;
use std::time::Duration;

/// Receives engine events. Every method defaults to doing nothing.
pub trait MigrationObserver {
    /// The target database is reachable and the history table exists.
    fn initialized(
        &mut self,
        _db_type: &str,
        _target: &str,
        _created_database: bool,
        _created_history_table: bool,
    ) {
    }

    /// Every history entry matched a script on disk.
    fn validated(&mut self, _checked: usize) {}

    /// A script was outside the upgrade range.
    fn script_skipped(&mut self, _script: &ScriptFile, _reason: &SkipReason) {}

    /// A script is about to run.
    fn script_started(&mut self, _script: &ScriptFile, _transactional: bool) {}

    /// A script ran, was recorded, and was committed.
    fn script_applied(&mut self, _script: &ScriptFile, _elapsed: Duration) {}

    /// A script failed and its transaction was rolled back.
    fn script_failed(&mut self, _script: &ScriptFile, _error: &MigrateError) {}
}

/// Observer that writes events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn initialized(
        &mut self,
        db_type: &str,
        target: &str,
        created_database: bool,
        created_history_table: bool,
    ) {
        if created_database {
            log::info!("Created target database {target}");
        }
        if created_history_table {
            log::info!("Created version history table");
        }
        log::info!("Connected to {db_type} database {target}");
    }

    fn validated(&mut self, checked: usize) {
        log::info!("Validated {checked} applied script(s) against the scripts directory");
    }

    fn script_skipped(&mut self, script: &ScriptFile, reason: &SkipReason) {
        log::info!(
            "Skipping script: {} as its version {} is not in the upgrade range ({reason})",
            script.path(),
            script.version()
        );
    }

    fn script_started(&mut self, script: &ScriptFile, transactional: bool) {
        log::info!("Running script: {}", script.path());
        if !transactional {
            log::warn!(
                "Script {} has instructed to turn off transaction",
                script.path()
            );
        }
    }

    fn script_applied(&mut self, script: &ScriptFile, elapsed: Duration) {
        log::info!(
            "Finished running script: {} (version {}, {} ms)",
            script.path(),
            script.version(),
            elapsed.as_millis()
        );
    }

    fn script_failed(&mut self, script: &ScriptFile, error: &MigrateError) {
        log::error!("Script {} failed: {error}", script.path());
    }
}
