//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// dbevolve - Versioned SQL schema migrations for DuckDB and SQLite
#[derive(Parser, Debug)]
#[command(name = "dbevolve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Path to a dbevolve.yml config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    /// Connection overrides
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Connection settings; each one overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Target database file (or :memory:)
    #[arg(short = 'c', long, global = true, env = "DBEVOLVE_CONNECTION")]
    pub connection: Option<String>,

    /// Database backend
    #[arg(short = 'b', long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Directory containing the migration scripts
    #[arg(short = 'f', long, global = true)]
    pub scripts_dir: Option<String>,

    /// Name of the version history table
    #[arg(short = 'n', long, global = true)]
    pub table: Option<String>,

    /// Per-command timeout in seconds (0 disables it)
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<u64>,
}

/// Database backends selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    /// DuckDB database file
    Duckdb,
    /// SQLite database file
    Sqlite,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate applied scripts, then apply pending ones
    Migrate(MigrateArgs),

    /// Check applied scripts against the scripts directory
    Validate(ValidateArgs),

    /// Show each script's state relative to the version history
    Status(StatusArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Highest version to apply, as major_minor (e.g. 2_5) or a number (e.g. 205)
    #[arg(short = 'v', long, value_parser = parse_version_arg)]
    pub max_version: Option<u32>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Accept either `major_minor` or an already-combined version number.
fn parse_version_arg(value: &str) -> Result<u32, String> {
    let value = value.trim();
    if value.contains('_') {
        dbe_core::parse_version_label(value).map_err(|_| {
            format!("'{value}' is not a valid version (expected major_minor, minor below 100)")
        })
    } else {
        value
            .parse::<u32>()
            .map_err(|_| format!("'{value}' is not a valid version number"))
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
