//! Validate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{self, Settings};

/// Execute the validate command.
///
/// Connects (creating the database and history table if needed) and checks
/// every applied script against the scripts directory. Applies nothing.
pub(crate) fn execute(_args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let settings = Settings::resolve(global)?;

    let mut engine = settings.engine();
    engine.initialize().map_err(common::fail)?;
    engine
        .validate_scripts(&settings.scripts_dir)
        .map_err(common::fail)?;

    println!("All applied scripts match {}.", settings.scripts_dir.display());
    Ok(())
}
