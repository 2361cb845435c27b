//! Show sync state; `--fix` repairs configuration and index.
//!
//! Plain `status` is strictly read-only: it compares local content
//! hashes against the index and prints a table, touching no file and
//! issuing no remote request. `--fix` is the sole recovery operation:
//! it re-resolves the root URL (consuming legacy keys), rewrites it into
//! `default_parent_url`, and normalizes record ids — still without any
//! remote writes.

use std::fs;
use std::path::Path;

use colored::Colorize;
use walkdir::WalkDir;

use crate::config::{self, ProjectConfig, META_DIR};
use crate::error::Result;
use crate::hash::{sha1_hex, has_changed};
use crate::index::{Index, RecordKind};
use crate::push::is_pushable_file;
use crate::resolver;

/// Execute `ns status`.
///
/// # Errors
///
/// Fails when the index is corrupt (and `--fix` cannot parse it either)
/// or the project folder is unreadable.
pub fn execute(folder: &Path, fix: bool) -> Result<u8> {
    config::load_env_for_project(folder);
    let cfg = ProjectConfig::load(folder)?;
    let mut index = Index::load(folder, cfg.sync_mode)?;

    if fix {
        return run_fix(folder, cfg, &mut index);
    }

    let mut clean = 0usize;
    let mut modified = 0usize;
    let mut missing = 0usize;

    for (rel, record) in index.iter() {
        if rel.is_empty() {
            continue;
        }
        let abs = folder.join(rel);
        match record.kind {
            RecordKind::Directory => {
                if !abs.is_dir() {
                    missing += 1;
                    println!("{:>9}  {rel}", "missing".red());
                }
            }
            _ => match fs::read(&abs) {
                Ok(bytes) => {
                    let current = sha1_hex(&bytes);
                    if has_changed(&current, record.content_sha1.as_deref()) {
                        modified += 1;
                        println!("{:>9}  {rel}", "modified".yellow());
                    } else {
                        clean += 1;
                    }
                }
                Err(_) => {
                    missing += 1;
                    println!("{:>9}  {rel}", "missing".red());
                }
            },
        }
    }

    let untracked = untracked_files(folder, &index);
    for rel in &untracked {
        println!("{:>9}  {rel}", "untracked".cyan());
    }

    println!(
        "{clean} clean, {modified} modified, {missing} missing, {} untracked",
        untracked.len()
    );
    Ok(0)
}

/// Local pushable files with no index record, ignore-filtered.
fn untracked_files(folder: &Path, index: &Index) -> Vec<String> {
    let mut result = Vec::new();
    let walker = WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with('.') || n == META_DIR)
        });
    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(folder) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        let name = entry.file_name().to_string_lossy();
        if !is_pushable_file(&name) || index.is_ignored(&rel, false) {
            continue;
        }
        if index.get(&rel).is_none() {
            result.push(rel);
        }
    }
    result
}

/// `status --fix`: consolidate the root URL and normalize the index.
fn run_fix(folder: &Path, mut cfg: ProjectConfig, index: &mut Index) -> Result<u8> {
    let root_url = resolver::resolve_root_url(&cfg, index)?;
    let changed_config = cfg.default_parent_url.as_deref() != Some(root_url.as_str());
    cfg.default_parent_url = Some(root_url.clone());
    cfg.save(folder)?;

    // Normalize ids to dashed form and rebuild URLs that lost their id
    let rels: Vec<String> = index.iter().map(|(rel, _)| rel.clone()).collect();
    let mut normalized = 0usize;
    for rel in rels {
        if let Some(record) = index.get_mut(&rel) {
            let dashed = resolver::dashed_id(&record.page_id);
            let compact = resolver::compact_id(&record.page_id);
            let mut touched = false;
            if record.page_id != dashed {
                record.page_id = dashed;
                touched = true;
            }
            if !record.page_url.contains(&compact) {
                record.page_url = resolver::page_url_for_id(&record.page_id);
                touched = true;
            }
            if touched {
                normalized += 1;
            }
        }
    }
    index.set_root_page_url(&root_url);
    index.save()?;

    if changed_config {
        println!("Rewrote default_parent_url: {root_url}");
    }
    println!("Normalized {normalized} record(s)");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncMode;
    use crate::index::IndexRecord;
    use tempfile::TempDir;

    fn collect_tree(folder: &Path) -> Vec<(String, Vec<u8>)> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(folder)
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                entries.push((rel, fs::read(entry.path()).unwrap()));
            }
        }
        entries
    }

    fn seeded_project(temp_dir: &TempDir) {
        let cfg = ProjectConfig {
            default_parent_url: Some(
                "https://www.notion.so/27db1a4f8d1c4ce59f2a11aa6bb41234".into(),
            ),
            ..ProjectConfig::default()
        };
        cfg.save(temp_dir.path()).unwrap();

        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let mut record = IndexRecord::new(
            RecordKind::File,
            "27DB1A4F8D1C4CE59F2A11AA6BB49999".into(),
            "https://www.notion.so/stale".into(),
        );
        record.content_sha1 = Some(sha1_hex(b"tracked\n"));
        index.put("tracked.md", record).unwrap();
        index.save().unwrap();

        fs::write(temp_dir.path().join("tracked.md"), "tracked\n").unwrap();
        fs::write(temp_dir.path().join("untracked.md"), "new\n").unwrap();
    }

    #[test]
    fn test_status_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        seeded_project(&temp_dir);

        let before = collect_tree(temp_dir.path());
        let code = execute(temp_dir.path(), false).unwrap();
        let after = collect_tree(temp_dir.path());

        assert_eq!(code, 0);
        assert_eq!(before, after, "status must not change any file");
    }

    #[test]
    fn test_untracked_detection() {
        let temp_dir = TempDir::new().unwrap();
        seeded_project(&temp_dir);

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let untracked = untracked_files(temp_dir.path(), &index);
        assert_eq!(untracked, vec!["untracked.md".to_string()]);
    }

    #[test]
    fn test_fix_normalizes_ids_and_urls() {
        let temp_dir = TempDir::new().unwrap();
        seeded_project(&temp_dir);

        execute(temp_dir.path(), true).unwrap();

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let record = index.get("tracked.md").unwrap();
        assert_eq!(record.page_id, "27db1a4f-8d1c-4ce5-9f2a-11aa6bb49999");
        assert!(record
            .page_url
            .contains("27db1a4f8d1c4ce59f2a11aa6bb49999"));
    }

    #[test]
    fn test_fix_rewrites_legacy_root_url_into_config() {
        let temp_dir = TempDir::new().unwrap();
        // Config without a root URL, legacy key only in the index
        ProjectConfig::default().save(temp_dir.path()).unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        index.set_root_page_url("https://www.notion.so/27db1a4f8d1c4ce59f2a11aa6bb41234");
        index.save().unwrap();

        execute(temp_dir.path(), true).unwrap();

        let cfg = ProjectConfig::load(temp_dir.path()).unwrap();
        assert_eq!(
            cfg.default_parent_url.as_deref(),
            Some("https://www.notion.so/27db1a4f8d1c4ce59f2a11aa6bb41234")
        );
    }
}
