//! Migrate command implementation

use anyhow::{Context, Result};
use dbe_migrate::RunReport;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{self, Settings};

/// Execute the migrate command: initialize, validate, then apply pending scripts.
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let settings = Settings::resolve(global)?;
    let ceiling = settings.ceiling(args.max_version);

    log::info!(
        "Upgrading {} database {} from {}",
        settings.config.database.db_type,
        settings.config.database.path,
        settings.scripts_dir.display()
    );

    let mut engine = settings.engine();
    let report = engine
        .evolve(&settings.scripts_dir, ceiling)
        .map_err(common::fail)?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    for applied in &report.applied {
        println!(
            "  applied  {:>6}  {} ({} ms)",
            applied.version, applied.path, applied.duration_ms
        );
    }
    for skipped in &report.skipped {
        println!(
            "  skipped  {:>6}  {} ({})",
            skipped.version, skipped.path, skipped.reason
        );
    }

    if report.applied.is_empty() {
        println!(
            "\nDatabase is up to date at version {}.",
            report.final_version
        );
    } else {
        println!(
            "\nApplied {} script(s): version {} -> {}.",
            report.applied.len(),
            report.starting_version,
            report.final_version
        );
    }
}
