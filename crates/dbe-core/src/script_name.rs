//! Version parsing for migration script file names.
//!
//! A script name looks like `V<major>_<minor>__<description>.sql` and maps to
//! the numeric version `major * 100 + minor`. Ordering of the whole migration
//! set depends on this mapping, so the splitting rules are strict:
//!
//! - the name starts with `V`
//! - `__` occurs exactly once, separating the version from the description
//! - the version splits on `_` into exactly two non-negative decimal integers
//! - `minor` stays below [`MINOR_VERSION_LIMIT`] so that versions never alias

use crate::error::{CoreError, CoreResult};
use std::path::Path;

/// Prefix marking the version segment.
pub const VERSION_PREFIX: char = 'V';

/// Separator between the version segment and the description.
pub const DESCRIPTION_SEPARATOR: &str = "__";

/// Separator between major and minor version numbers.
pub const VERSION_PART_SEPARATOR: char = '_';

/// Exclusive upper bound for the minor version.
///
/// `V1_100` would otherwise encode to the same number as `V2_0`.
pub const MINOR_VERSION_LIMIT: u32 = 100;

/// Parse a script file name into its numeric version.
///
/// ```
/// use dbe_core::script_name::parse_script_name;
///
/// assert_eq!(parse_script_name("V1_0__InitialSetup.sql").unwrap(), 100);
/// assert_eq!(parse_script_name("V002_5__AddNewTable.sql").unwrap(), 205);
/// assert!(parse_script_name("V1-0__InitialSetup.sql").is_err());
/// ```
pub fn parse_script_name(file_name: &str) -> CoreResult<u32> {
    let invalid = |reason: &str| CoreError::InvalidScriptName {
        name: file_name.to_string(),
        reason: reason.to_string(),
    };

    let Some(rest) = file_name.strip_prefix(VERSION_PREFIX) else {
        return Err(invalid("expected to start with 'V'"));
    };

    let segments: Vec<&str> = rest.split(DESCRIPTION_SEPARATOR).collect();
    if segments.len() != 2 {
        return Err(invalid(
            "expected exactly one '__' between version and description",
        ));
    }

    version_from_label(segments[0]).map_err(invalid)
}

/// Parse a bare `<major>_<minor>` label, such as `2_5`, into its version.
pub fn parse_version_label(label: &str) -> CoreResult<u32> {
    version_from_label(label).map_err(|reason| CoreError::InvalidScriptName {
        name: label.to_string(),
        reason: reason.to_string(),
    })
}

fn version_from_label(label: &str) -> Result<u32, &'static str> {
    let parts: Vec<&str> = label.split(VERSION_PART_SEPARATOR).collect();
    let [major, minor] = parts.as_slice() else {
        return Err("expected version as <major>_<minor>");
    };

    let major = parse_version_number(major).ok_or("major version is not a number")?;
    let minor = parse_version_number(minor).ok_or("minor version is not a number")?;

    if minor >= MINOR_VERSION_LIMIT {
        return Err("minor version must be less than 100");
    }

    major
        .checked_mul(MINOR_VERSION_LIMIT)
        .and_then(|v| v.checked_add(minor))
        .ok_or("version number is too large")
}

/// Parse the file-name component of `path`.
pub fn parse_script_path(path: &Path) -> CoreResult<u32> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::InvalidScriptName {
            name: path.display().to_string(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;
    parse_script_name(file_name)
}

/// ASCII digits only; `u32::from_str` would also accept a leading `+`.
fn parse_version_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
#[path = "script_name_test.rs"]
mod tests;
