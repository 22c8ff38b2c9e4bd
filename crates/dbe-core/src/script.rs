//! Migration script records.

use crate::checksum::ContentHash;
use crate::error::{CoreError, CoreResult};
use crate::script_name::parse_script_path;
use std::fmt;
use std::path::Path;

/// One migration script discovered on disk.
///
/// Built fresh on every directory scan. The version is derived from the file
/// name and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    version: u32,
    path: String,
    content_hash: ContentHash,
}

impl ScriptFile {
    /// Build a record for the script at `path` whose content is `bytes`.
    ///
    /// The version is parsed from the file name; the hash is taken over
    /// `bytes` exactly as given.
    pub fn from_contents(path: impl Into<String>, bytes: &[u8]) -> CoreResult<Self> {
        let path = path.into();
        let version = parse_script_path(Path::new(&path))?;
        Ok(Self {
            version,
            path,
            content_hash: ContentHash::of(bytes),
        })
    }

    /// Numeric version (`major * 100 + minor`).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Full path of the script; the key matched against history entries.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Digest of the content at discovery time.
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Read the script bytes as they are on disk now.
    pub fn read_bytes(&self) -> CoreResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| CoreError::IoWithPath {
            path: self.path.clone(),
            source: e,
        })
    }

    /// File-name component, falling back to the full path.
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }
}

impl fmt::Display for ScriptFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Decode script bytes as UTF-8, dropping a leading byte-order mark.
pub fn decode_script_text(path: &str, bytes: &[u8]) -> CoreResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| CoreError::ScriptEncoding {
            path: path.to_string(),
            message: e.to_string(),
        })
}
