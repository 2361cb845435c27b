//! Content hashing and mtime capture for change detection.
//!
//! Push and pull decide whether a file needs work by comparing the SHA-1
//! of its current bytes against the hash recorded at last sync. The
//! nanosecond mtime is stored alongside so an unchanged mtime can skip
//! the hash entirely.

use sha1::{Digest, Sha1};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Compute the SHA-1 hex digest of a byte slice.
#[must_use]
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-1 hex digest of a file's bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha1_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(sha1_hex(&bytes))
}

/// Check whether content has changed since the recorded hash.
///
/// Returns `true` when there is no stored hash (never synced) or the
/// hashes differ.
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.map_or(true, |h| h != current_hash)
}

/// Nanosecond mtime of a path, or 0 if unavailable.
#[must_use]
pub fn mtime_ns(path: &Path) -> u128 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos())
}
