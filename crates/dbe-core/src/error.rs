//! Error types for dbe-core

use thiserror::Error;

/// Core error type for dbevolve
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Script file name does not follow `V<major>_<minor>__<description>.sql`
    #[error("[E001] Invalid script file name '{name}': {reason}. Expected format: V<MajorVersion>_<MinorVersion>__<description>.sql")]
    InvalidScriptName { name: String, reason: String },

    /// E002: Two script files resolve to the same version
    #[error("[E002] Duplicate script version {version}: {first} and {second}")]
    DuplicateVersion {
        version: u32,
        first: String,
        second: String,
    },

    /// E003: Scripts directory does not exist or is not a directory
    #[error("[E003] Scripts directory not found: {path}")]
    ScriptsDirNotFound { path: String },

    /// E004: Script content is not valid UTF-8
    #[error("[E004] Script {path} is not valid UTF-8: {message}")]
    ScriptEncoding { path: String, message: String },

    /// E005: Configuration file not found
    #[error("[E005] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E006: Failed to parse configuration file
    #[error("[E006] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E007: Invalid configuration value
    #[error("[E007] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E008: IO error with file path context
    #[error("[E008] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
