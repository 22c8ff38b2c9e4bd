//! Status command implementation

use anyhow::{Context, Result};
use dbe_migrate::{ScriptState, ScriptStatus};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{self, Settings};

/// Execute the status command.
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let settings = Settings::resolve(global)?;

    let mut engine = settings.engine();
    engine.initialize().map_err(common::fail)?;
    let rows = engine
        .status(&settings.scripts_dir)
        .map_err(common::fail)?;

    match args.output {
        StatusOutput::Json => {
            let json = serde_json::to_string_pretty(&rows).context("Failed to serialize status")?;
            println!("{json}");
        }
        StatusOutput::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &[ScriptStatus]) {
    if rows.is_empty() {
        println!("No scripts found.");
        return;
    }

    let path_width = rows.iter().map(|r| r.path.len()).max().unwrap_or(4).max(4);
    println!(
        "{:>7}  {:<8}  {:<path_width$}  APPLIED AT",
        "VERSION", "STATE", "PATH"
    );
    for row in rows {
        let applied_at = row
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>7}  {:<8}  {:<path_width$}  {}",
            row.version,
            row.state.to_string(),
            row.path,
            applied_at
        );
    }

    let pending = rows
        .iter()
        .filter(|r| r.state == ScriptState::Pending)
        .count();
    println!("\n{} script(s), {pending} pending.", rows.len());
}
