//! Script discovery.
//!
//! Scans a flat scripts directory for `.sql` files and returns them ordered by
//! version. Every call re-reads the disk.

use crate::error::{CoreError, CoreResult};
use crate::script::ScriptFile;
use std::path::Path;

/// Extension of migration scripts (compared ASCII case-insensitively).
pub const SCRIPT_EXTENSION: &str = "sql";

/// List the migration scripts in `dir`, sorted ascending by version.
///
/// Subdirectories are not searched. A file with a malformed name fails the
/// whole scan, as do two files resolving to the same version.
pub fn list_scripts(dir: &Path) -> CoreResult<Vec<ScriptFile>> {
    if !dir.is_dir() {
        return Err(CoreError::ScriptsDirNotFound {
            path: dir.display().to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() || !has_script_extension(&path) {
            continue;
        }

        let bytes = std::fs::read(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let script = ScriptFile::from_contents(path.display().to_string(), &bytes)?;
        log::debug!(
            "Discovered script {} (version {}, sha256 {})",
            script.path(),
            script.version(),
            script.content_hash()
        );
        scripts.push(script);
    }

    scripts.sort_by(|a, b| {
        a.version()
            .cmp(&b.version())
            .then_with(|| a.path().cmp(b.path()))
    });
    reject_duplicate_versions(&scripts)?;

    Ok(scripts)
}

fn has_script_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SCRIPT_EXTENSION))
}

/// Expects `scripts` sorted by version.
fn reject_duplicate_versions(scripts: &[ScriptFile]) -> CoreResult<()> {
    for pair in scripts.windows(2) {
        if pair[0].version() == pair[1].version() {
            return Err(CoreError::DuplicateVersion {
                version: pair[0].version(),
                first: pair[0].path().to_string(),
                second: pair[1].path().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "repository_test.rs"]
mod tests;
