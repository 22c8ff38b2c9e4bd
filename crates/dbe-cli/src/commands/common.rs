//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dbe_core::{Config, DbType};
use dbe_db::backend_for;
use dbe_migrate::{EngineOptions, MigrateError, MigrationEngine};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::cli::{BackendArg, ConnectionArgs, GlobalArgs};

/// Exit code for a failed migration run.
pub(crate) const EXIT_FAILURE: i32 = 1;

/// Exit code when the version history no longer matches the scripts directory.
pub(crate) const EXIT_DRIFT: i32 = 2;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the engine and its connection are dropped before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ExitCode carries no message; the error was already reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Effective settings for one invocation: config file values with CLI
/// overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub config: Config,
    pub scripts_dir: PathBuf,
}

impl Settings {
    /// Resolve settings from `--config`, a config file in the working
    /// directory, or defaults, then apply connection flags.
    pub(crate) fn resolve(global: &GlobalArgs) -> Result<Self> {
        let (config, root) = match &global.config {
            Some(path) => {
                let path = Path::new(path);
                let config = Config::load(path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (config, root)
            }
            None => {
                let config = Config::load_from_dir(Path::new("."))
                    .context("Failed to load dbevolve.yml")?
                    .unwrap_or_default();
                (config, PathBuf::new())
            }
        };
        Self::from_config(config, &root, &global.connection)
    }

    /// Apply `overrides` on top of `config`.
    ///
    /// A scripts directory from the config file is taken relative to `root`;
    /// one given on the command line is used as is. `.` components in `root`
    /// are dropped so `--config ./dbevolve.yml` records the same script paths
    /// as a config found in the working directory.
    pub(crate) fn from_config(
        mut config: Config,
        root: &Path,
        overrides: &ConnectionArgs,
    ) -> Result<Self> {
        if let Some(connection) = &overrides.connection {
            config.database.path = connection.clone();
        }
        if let Some(backend) = overrides.backend {
            config.database.db_type = match backend {
                BackendArg::Duckdb => DbType::DuckDb,
                BackendArg::Sqlite => DbType::Sqlite,
            };
        }
        if let Some(table) = &overrides.table {
            config.history_table = table.clone();
        }
        if let Some(timeout) = overrides.timeout {
            config.command_timeout_secs = timeout;
        }

        let scripts_dir = match &overrides.scripts_dir {
            Some(dir) => {
                config.scripts_dir = dir.clone();
                PathBuf::from(dir)
            }
            None => {
                let root: PathBuf = root
                    .components()
                    .filter(|c| !matches!(c, Component::CurDir))
                    .collect();
                config.scripts_dir_absolute(&root)
            }
        };

        config.validate().context("Invalid settings")?;
        Ok(Self {
            config,
            scripts_dir,
        })
    }

    /// Ceiling for this run: the CLI value if given, else the config value.
    pub(crate) fn ceiling(&self, cli_max_version: Option<u32>) -> u32 {
        cli_max_version.unwrap_or(self.config.max_version)
    }

    /// Build an engine for the configured target.
    pub(crate) fn engine(&self) -> MigrationEngine {
        let options = EngineOptions {
            history_table: self.config.history_table.clone(),
            command_timeout_secs: self.config.command_timeout_secs,
        };
        MigrationEngine::new(backend_for(&self.config.database), options)
    }
}

/// Report an engine error on stderr and map it to an exit code.
pub(crate) fn fail(err: MigrateError) -> anyhow::Error {
    let code = if err.is_drift() {
        EXIT_DRIFT
    } else {
        EXIT_FAILURE
    };
    eprintln!("Error: {}", error_chain(&err));
    ExitCode(code).into()
}

/// Render an error and its sources on one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
