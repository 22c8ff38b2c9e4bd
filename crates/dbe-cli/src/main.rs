//! dbevolve CLI - versioned SQL schema migrations for DuckDB and SQLite

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;

mod cli;
mod commands;

use cli::{Cli, GlobalArgs};
use commands::common::ExitCode;
use commands::{migrate, status, validate};

fn main() {
    let cli = Cli::parse();

    let result = init_logger(&cli.global).and_then(|()| run(&cli));
    if let Err(err) = result {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(ec) => ec.0,
            None => {
                eprintln!("Error: {err:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global),
        cli::Commands::Validate(args) => validate::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
    }
}

/// Install the global logger.
///
/// `RUST_LOG` wins over the default level; `--verbose` raises the default
/// to debug. With `--log-file` records are appended to that file.
fn init_logger(global: &GlobalArgs) -> Result<()> {
    let default_level = if global.verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();

    if let Some(path) = &global.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder
        .try_init()
        .context("Failed to initialize logger")?;
    Ok(())
}
