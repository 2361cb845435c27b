//! Persistent index mapping local relative paths to remote pages.
//!
//! The index lives at `.c2n/index.yaml` as a structured document with
//! stable key ordering (so diffs stay minimal) and is written atomically
//! (write-temp-then-rename with fsync). Unknown keys — both top-level and
//! per-record — are preserved on round trips for forward compatibility.
//!
//! One record exists per synchronized item, keyed by relative path; the
//! empty-string key is reserved for the project root. In Hierarchy mode
//! every non-root record's parent path must hold a `directory` record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::{index_path, SyncMode, IGNORE_FILE};
use crate::error::{Error, Result};

/// What kind of local item a record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A Markdown or code file (Hierarchy mode).
    File,
    /// A directory backed by a folder page (Hierarchy mode).
    Directory,
    /// A flat-mode page file.
    Page,
}

/// One synchronized item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub kind: RecordKind,

    /// Dashed UUID of the remote page.
    pub page_id: String,

    /// Canonical remote URL (contains `page_id` in compact form).
    pub page_url: String,

    /// Dashed UUID of the remote parent page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Title used when the remote page was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// SHA-1 of the last-pushed/pulled local bytes. Absent for
    /// directories and for records never synced as content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sha1: Option<String>,

    /// Nanosecond mtime of the last-observed local bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_mtime_ns: Option<u64>,

    /// RFC-3339 `last_edited_time` reported by the remote at last sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_last_edited: Option<String>,

    /// RFC-3339 wall clock at sync completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<String>,

    /// Unknown keys, preserved verbatim on round trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl IndexRecord {
    /// Minimal record for a newly tracked item.
    #[must_use]
    pub fn new(kind: RecordKind, page_id: String, page_url: String) -> Self {
        Self {
            kind,
            page_id,
            page_url,
            parent_id: None,
            title: None,
            content_sha1: None,
            local_mtime_ns: None,
            remote_last_edited: None,
            last_sync_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// String value of a preserved unknown key (legacy fields).
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_yaml::Value::as_str)
    }
}

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDoc {
    /// Legacy root URL. Read for resolution, preserved even when empty.
    #[serde(default)]
    root_page_url: String,

    #[serde(default)]
    items: BTreeMap<String, IndexRecord>,

    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// In-memory index plus the ignore matcher for the project.
pub struct Index {
    path: PathBuf,
    doc: IndexDoc,
    sync_mode: SyncMode,
    ignore: Option<Gitignore>,
}

impl Index {
    /// Load the index for a project directory.
    ///
    /// A missing file yields an empty index; an unparsable file yields
    /// [`Error::IndexCorrupt`] so callers refuse to write over it.
    ///
    /// # Errors
    ///
    /// Returns `IndexCorrupt` on parse failure and `Io` on read failure.
    pub fn load(project_dir: &Path, sync_mode: SyncMode) -> Result<Self> {
        let path = index_path(project_dir);
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_yaml::from_str(&text).map_err(|e| Error::IndexCorrupt {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            IndexDoc::default()
        };

        let ignore_path = project_dir.join(IGNORE_FILE);
        let ignore = if ignore_path.exists() {
            let mut builder = GitignoreBuilder::new(project_dir);
            builder.add(&ignore_path);
            builder.build().ok()
        } else {
            None
        };

        Ok(Self {
            path,
            doc,
            sync_mode,
            ignore,
        })
    }

    /// The legacy top-level root URL, if non-empty.
    #[must_use]
    pub fn root_page_url(&self) -> Option<&str> {
        if self.doc.root_page_url.is_empty() {
            None
        } else {
            Some(&self.doc.root_page_url)
        }
    }

    /// Overwrite the legacy root URL (used only by `status --fix` and
    /// project initialization).
    pub fn set_root_page_url(&mut self, url: &str) {
        self.doc.root_page_url = url.to_string();
    }

    /// Look up the record for a relative path.
    #[must_use]
    pub fn get(&self, rel_path: &str) -> Option<&IndexRecord> {
        self.doc.items.get(rel_path)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, rel_path: &str) -> Option<&mut IndexRecord> {
        self.doc.items.get_mut(rel_path)
    }

    /// Upsert a record.
    ///
    /// # Errors
    ///
    /// In Hierarchy mode, returns [`Error::InvariantViolation`] when the
    /// parent path of a non-root record has no `directory` record.
    pub fn put(&mut self, rel_path: &str, record: IndexRecord) -> Result<()> {
        if self.sync_mode == SyncMode::Hierarchy && !rel_path.is_empty() {
            if let Some(parent) = Path::new(rel_path).parent() {
                let parent_key = parent.to_string_lossy();
                if !parent_key.is_empty() {
                    let ok = self
                        .doc
                        .items
                        .get(parent_key.as_ref())
                        .is_some_and(|r| r.kind == RecordKind::Directory);
                    if !ok {
                        return Err(Error::InvariantViolation(format!(
                            "no directory record for parent path '{parent_key}' of '{rel_path}'"
                        )));
                    }
                }
            }
        }
        self.doc.items.insert(rel_path.to_string(), record);
        Ok(())
    }

    /// Remove a record (used by `status --fix` normalization only; sync
    /// never deletes records when counterparts disappear).
    pub fn remove(&mut self, rel_path: &str) -> Option<IndexRecord> {
        self.doc.items.remove(rel_path)
    }

    /// Iterate records in stable path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexRecord)> {
        self.doc.items.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc.items.len()
    }

    /// Whether the index has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc.items.is_empty()
    }

    /// Whether any record maps to the given page id (dashed form).
    #[must_use]
    pub fn contains_page(&self, page_id: &str) -> bool {
        self.doc.items.values().any(|r| r.page_id == page_id)
    }

    /// Evaluate `.c2n_ignore` for a relative path.
    ///
    /// Uses gitignore matching semantics: `/`-anchoring, trailing `/` for
    /// directory-only patterns, `**` globbing, and `!` negation.
    #[must_use]
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|g| g.matched_path_or_any_parents(rel_path, is_dir).is_ignore())
    }

    /// Write the index atomically.
    ///
    /// Serialization is deterministic: records live in a `BTreeMap`, so
    /// equal indexes produce byte-equal documents. The legacy
    /// `root_page_url` key is always emitted, even when empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the temp file cannot be written or renamed.
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&self.doc)?;
        let temp_path = self.path.with_extension("yaml.tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(kind: RecordKind, id: &str) -> IndexRecord {
        IndexRecord::new(
            kind,
            id.to_string(),
            format!("https://www.notion.so/{}", id.replace('-', "")),
        )
    }

    #[test]
    fn test_load_missing_index_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        assert!(index.is_empty());
        assert!(index.root_page_url().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        index.set_root_page_url("https://www.notion.so/root");

        let mut rec = record(RecordKind::File, "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234");
        rec.content_sha1 = Some("abc".into());
        rec.local_mtime_ns = Some(123);
        rec.remote_last_edited = Some("2025-01-01T00:00:00.000Z".into());
        index.put("README.md", rec.clone()).unwrap();
        index.save().unwrap();

        let reloaded = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("README.md"), Some(&rec));
        assert_eq!(
            reloaded.root_page_url(),
            Some("https://www.notion.so/root")
        );
    }

    #[test]
    fn test_save_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        index
            .put("b.md", record(RecordKind::File, "id-b"))
            .unwrap();
        index
            .put("a.md", record(RecordKind::File, "id-a"))
            .unwrap();
        index.save().unwrap();
        let first = fs::read_to_string(index_path(temp_dir.path())).unwrap();

        index.save().unwrap();
        let second = fs::read_to_string(index_path(temp_dir.path())).unwrap();
        assert_eq!(first, second);
        // BTreeMap ordering puts a.md before b.md regardless of insert order
        assert!(first.find("a.md").unwrap() < first.find("b.md").unwrap());
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".c2n")).unwrap();
        fs::write(
            index_path(temp_dir.path()),
            "root_page_url: ''\ngenerated_at: 1700000000\nitems:\n  README.md:\n    kind: file\n    page_id: abc\n    page_url: https://www.notion.so/abc\n    legacy_field: keep-me\n",
        )
        .unwrap();

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        assert_eq!(
            index.get("README.md").unwrap().extra_str("legacy_field"),
            Some("keep-me")
        );
        index.save().unwrap();

        let text = fs::read_to_string(index_path(temp_dir.path())).unwrap();
        assert!(text.contains("legacy_field: keep-me"));
        assert!(text.contains("generated_at: 1700000000"));
        assert!(text.contains("root_page_url: ''"));
    }

    #[test]
    fn test_corrupt_index_refuses_to_load() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".c2n")).unwrap();
        fs::write(index_path(temp_dir.path()), "items: [not, a, map").unwrap();

        let result = Index::load(temp_dir.path(), SyncMode::Hierarchy);
        assert!(matches!(result, Err(Error::IndexCorrupt { .. })));
    }

    #[test]
    fn test_put_requires_parent_directory_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();

        let result = index.put("docs/api.md", record(RecordKind::File, "id-1"));
        assert!(matches!(result, Err(Error::InvariantViolation(_))));

        index
            .put("docs", record(RecordKind::Directory, "id-dir"))
            .unwrap();
        index
            .put("docs/api.md", record(RecordKind::File, "id-1"))
            .unwrap();
    }

    #[test]
    fn test_flat_mode_skips_parent_check() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Flat).unwrap();
        index
            .put("Deep Page.md", record(RecordKind::Page, "id-1"))
            .unwrap();
    }

    #[test]
    fn test_ignore_patterns() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(IGNORE_FILE),
            "*.log\nbuild/\n/top.md\n!keep.log\ndocs/**/draft.md\n",
        )
        .unwrap();

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        assert!(index.is_ignored("debug.log", false));
        assert!(!index.is_ignored("keep.log", false));
        assert!(index.is_ignored("build", true));
        assert!(index.is_ignored("build/out.md", false));
        assert!(index.is_ignored("top.md", false));
        assert!(!index.is_ignored("nested/top.md", false));
        assert!(index.is_ignored("docs/a/b/draft.md", false));
        assert!(!index.is_ignored("notes.md", false));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        index
            .put("a.md", record(RecordKind::File, "id-a"))
            .unwrap();
        index.save().unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path().join(".c2n"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["index.yaml"]);
    }
}
