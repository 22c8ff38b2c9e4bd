//! SHA-256 content fingerprints for drift detection.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a [`ContentHash`] in bytes.
pub const CONTENT_HASH_LEN: usize = 32;

/// SHA-256 digest of a script's exact byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

impl ContentHash {
    /// Hash `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; CONTENT_HASH_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Rebuild a hash from stored bytes. Returns `None` unless `bytes` is
    /// exactly [`CONTENT_HASH_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; CONTENT_HASH_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
