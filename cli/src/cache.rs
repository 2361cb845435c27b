//! Filesystem and remote-tree caches (`.c2n/cache.json`).
//!
//! Two sections:
//! - `dir_snapshot`: memoized directory listings keyed by the directory's
//!   nanosecond mtime, so an unchanged directory skips a re-listing.
//! - `remote_tree`: the last remote subtree enumeration with its capture
//!   time, reused by pull while fresh.
//!
//! The cache is advisory; a missing or unreadable file is treated as
//! empty and never fails a command.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::cache_path;

/// Maximum age of the remote tree snapshot before pull re-enumerates.
const REMOTE_SNAPSHOT_TTL_MINUTES: i64 = 10;

/// One memoized directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    /// Nanosecond mtime of the directory at capture time.
    pub mtime_ns: u64,
    /// Sorted child directory names.
    pub dirs: Vec<String>,
    /// Sorted child file names.
    pub files: Vec<String>,
}

/// One remote page in the cached subtree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePageEntry {
    pub page_id: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub has_children: bool,
}

/// Cached remote subtree enumeration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTreeSnapshot {
    /// RFC-3339 capture time.
    pub captured_at: String,
    /// Breadth-first page list starting at the root.
    pub pages: Vec<RemotePageEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDoc {
    #[serde(default)]
    dir_snapshot: BTreeMap<String, DirListing>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_tree: Option<RemoteTreeSnapshot>,
}

/// High-level accessor for `.c2n/cache.json`.
pub struct Cache {
    path: std::path::PathBuf,
    doc: CacheDoc,
    dirty: bool,
}

impl Cache {
    /// Load the cache for a project, treating absent or unreadable data
    /// as empty.
    #[must_use]
    pub fn load(project_dir: &Path) -> Self {
        let path = cache_path(project_dir);
        let doc = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            path,
            doc,
            dirty: false,
        }
    }

    /// Cached listing for a relative directory path, valid only when the
    /// directory mtime still matches.
    #[must_use]
    pub fn dir_listing(&self, rel_dir: &str, current_mtime_ns: u64) -> Option<&DirListing> {
        self.doc
            .dir_snapshot
            .get(rel_dir)
            .filter(|l| l.mtime_ns == current_mtime_ns)
    }

    /// Record a fresh directory listing.
    pub fn set_dir_listing(&mut self, rel_dir: &str, listing: DirListing) {
        if self.doc.dir_snapshot.get(rel_dir) != Some(&listing) {
            self.doc.dir_snapshot.insert(rel_dir.to_string(), listing);
            self.dirty = true;
        }
    }

    /// The remote tree snapshot, if captured within the freshness window.
    #[must_use]
    pub fn fresh_remote_tree(&self, now: DateTime<Utc>) -> Option<&RemoteTreeSnapshot> {
        let snapshot = self.doc.remote_tree.as_ref()?;
        let captured = DateTime::parse_from_rfc3339(&snapshot.captured_at).ok()?;
        if now.signed_duration_since(captured.with_timezone(&Utc))
            <= Duration::minutes(REMOTE_SNAPSHOT_TTL_MINUTES)
        {
            Some(snapshot)
        } else {
            None
        }
    }

    /// Replace the remote tree snapshot.
    pub fn set_remote_tree(&mut self, snapshot: RemoteTreeSnapshot) {
        self.doc.remote_tree = Some(snapshot);
        self.dirty = true;
    }

    /// Drop all cached state.
    pub fn clear(&mut self) {
        self.doc = CacheDoc::default();
        self.dirty = true;
    }

    /// Persist if anything changed since load.
    pub fn save(&mut self) {
        if !self.dirty {
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(text) = serde_json::to_string_pretty(&self.doc) {
            if fs::write(&self.path, text).is_ok() {
                self.dirty = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_cache_for_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Cache::load(temp_dir.path());
        assert!(cache.dir_listing("docs", 1).is_none());
        assert!(cache.fresh_remote_tree(Utc::now()).is_none());
    }

    #[test]
    fn test_dir_listing_mtime_keyed() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = Cache::load(temp_dir.path());
        cache.set_dir_listing(
            "docs",
            DirListing {
                mtime_ns: 42,
                dirs: vec!["sub".into()],
                files: vec!["a.md".into()],
            },
        );

        assert!(cache.dir_listing("docs", 42).is_some());
        // Stale mtime invalidates the entry
        assert!(cache.dir_listing("docs", 43).is_none());
    }

    #[test]
    fn test_roundtrip_and_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc::now();
        {
            let mut cache = Cache::load(temp_dir.path());
            cache.set_remote_tree(RemoteTreeSnapshot {
                captured_at: now.to_rfc3339(),
                pages: vec![RemotePageEntry {
                    page_id: "id-1".into(),
                    title: "Root".into(),
                    parent_id: None,
                    has_children: true,
                }],
            });
            cache.save();
        }

        let cache = Cache::load(temp_dir.path());
        assert!(cache.fresh_remote_tree(now).is_some());

        let later = now + Duration::minutes(REMOTE_SNAPSHOT_TTL_MINUTES + 1);
        assert!(cache.fresh_remote_tree(later).is_none());
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".c2n")).unwrap();
        fs::write(cache_path(temp_dir.path()), "{broken").unwrap();

        let cache = Cache::load(temp_dir.path());
        assert!(cache.dir_listing("x", 0).is_none());
    }
}
