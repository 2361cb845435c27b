//! Push engine: local tree → remote pages.
//!
//! Enumeration and planning are pure and synchronous; execution drives
//! the remote client from a per-command tokio runtime. Directories are
//! created strictly before their contents (plan order), files fan out
//! through a bounded worker pool, and per-item failures are collected
//! into the report instead of aborting the walk.
//!
//! Updates replace the whole page body (delete all children, then append
//! freshly converted blocks): the remote block list has no diff
//! primitive, and replacement is the simplest transaction guaranteeing
//! `remote content == converted(local bytes)`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::cache::{Cache, DirListing};
use crate::config::{self, ProjectConfig, SyncMode};
use crate::convert::{
    code_file_to_blocks, is_image_extension, language_for_extension, markdown_to_blocks,
};
use crate::error::{Error, Result};
use crate::hash::{mtime_ns, sha1_hex};
use crate::index::{Index, IndexRecord, RecordKind};
use crate::notion::types::Block;
use crate::notion::NotionClient;
use crate::projection::parse_flat_frontmatter;
use crate::report::{Outcome, Report};
use crate::resolver::{self, extract_page_id};

/// Options for one push run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    pub force_all: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Planned action for one local item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    CreateFile,
    UpdateFile,
    SkipFile,
    CreateDirectory,
    SkipDirectoryUpdate,
}

impl PushAction {
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::CreateFile => "create",
            Self::UpdateFile => "update",
            Self::SkipFile => "skip",
            Self::CreateDirectory => "create-dir",
            Self::SkipDirectoryUpdate => "skip-dir",
        }
    }
}

/// One entry of the push plan.
#[derive(Debug, Clone)]
pub struct PlanItem {
    pub rel_path: String,
    pub parent_rel: String,
    pub title: String,
    pub action: PushAction,
    /// Existing remote page id (updates only).
    pub page_id: Option<String>,
    /// Current content hash (files only).
    pub sha1: Option<String>,
    pub mtime_ns: u64,
}

/// Run a push for the project at `project_dir`.
///
/// # Errors
///
/// Returns command-fatal errors only (missing auth, corrupt index);
/// per-item failures land in the returned report.
pub fn run(project_dir: &Path, opts: PushOptions) -> Result<Report> {
    config::load_env_for_project(project_dir);
    let cfg = ProjectConfig::load(project_dir)?;
    let mut index = Index::load(project_dir, cfg.sync_mode)?;
    let mut cache = Cache::load(project_dir);

    let root_url = resolver::resolve_root_url(&cfg, &index)?;
    let root_id = extract_page_id(&root_url)?;

    let plan = match cfg.sync_mode {
        SyncMode::Hierarchy => plan_hierarchy(project_dir, &index, &mut cache, opts)?,
        SyncMode::Flat => plan_flat(project_dir, &index, opts)?,
    };

    let mut report = Report::new();
    if opts.dry_run {
        for item in &plan {
            report.record(
                item.rel_path.clone(),
                match item.action {
                    PushAction::SkipFile | PushAction::SkipDirectoryUpdate => Outcome::Skipped,
                    _ => Outcome::Planned,
                },
                None,
            );
            println!("{:>10}  {}", item.action.as_str(), item.rel_path);
        }
        cache.save();
        return Ok(report);
    }

    let token = config::notion_token()?;
    let client = NotionClient::new(token, cfg.parallelism)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("cannot create async runtime: {e}")))?;
    runtime.block_on(execute(
        project_dir,
        &cfg,
        &client,
        &mut index,
        &root_id,
        plan,
        &mut report,
    ))?;

    index.save()?;
    cache.save();
    Ok(report)
}

// ── Planning ──────────────────────────────────────────────────

fn plan_hierarchy(
    project_dir: &Path,
    index: &Index,
    cache: &mut Cache,
    opts: PushOptions,
) -> Result<Vec<PlanItem>> {
    let mut plan = Vec::new();
    walk_dir(project_dir, "", index, cache, opts, &mut plan)?;
    Ok(plan)
}

/// Recursive pre-order walk: each directory contributes its own plan
/// item first, then its files (creations before updates), then its
/// subdirectories.
fn walk_dir(
    project_dir: &Path,
    rel_dir: &str,
    index: &Index,
    cache: &mut Cache,
    opts: PushOptions,
    plan: &mut Vec<PlanItem>,
) -> Result<()> {
    let abs_dir = if rel_dir.is_empty() {
        project_dir.to_path_buf()
    } else {
        project_dir.join(rel_dir)
    };

    let listing = read_dir_cached(&abs_dir, rel_dir, cache)?;

    let mut file_items = Vec::new();
    for name in &listing.files {
        let rel_path = join_rel(rel_dir, name);
        if index.is_ignored(&rel_path, false) {
            continue;
        }
        let abs_path = project_dir.join(&rel_path);
        let bytes = fs::read(&abs_path)?;
        let sha1 = sha1_hex(&bytes);
        let known = index.get(&rel_path);

        let action = match known {
            None => PushAction::CreateFile,
            Some(record) => {
                if opts.force_all || record.content_sha1.as_deref() != Some(sha1.as_str()) {
                    PushAction::UpdateFile
                } else {
                    PushAction::SkipFile
                }
            }
        };
        file_items.push(PlanItem {
            rel_path: rel_path.clone(),
            parent_rel: rel_dir.to_string(),
            title: file_title(name),
            action,
            page_id: known.map(|r| r.page_id.clone()),
            sha1: Some(sha1),
            mtime_ns: clamped_mtime(&abs_path),
        });
    }
    // Creations precede updates within a directory
    file_items.sort_by_key(|i| (i.action == PushAction::UpdateFile, i.rel_path.clone()));
    plan.extend(file_items);

    for name in &listing.dirs {
        let rel_path = join_rel(rel_dir, name);
        if index.is_ignored(&rel_path, true) {
            continue;
        }
        let known = index.get(&rel_path);
        // Existing directory pages are never re-touched, only missing
        // ones are created
        let action = if known.is_none() {
            PushAction::CreateDirectory
        } else {
            PushAction::SkipDirectoryUpdate
        };
        plan.push(PlanItem {
            rel_path: rel_path.clone(),
            parent_rel: rel_dir.to_string(),
            title: name.clone(),
            action,
            page_id: known.map(|r| r.page_id.clone()),
            sha1: None,
            mtime_ns: clamped_mtime(&project_dir.join(&rel_path)),
        });
        walk_dir(project_dir, &rel_path, index, cache, opts, plan)?;
    }
    Ok(())
}

/// List one directory, honoring the mtime-keyed cache.
fn read_dir_cached(abs_dir: &Path, rel_dir: &str, cache: &mut Cache) -> Result<DirListing> {
    let current_mtime = clamped_mtime(abs_dir);
    if let Some(hit) = cache.dir_listing(rel_dir, current_mtime) {
        debug!(rel_dir, "directory listing cache hit");
        return Ok(hit.clone());
    }

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(abs_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            dirs.push(name);
        } else if file_type.is_file() && is_pushable_file(&name) {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();

    let listing = DirListing {
        mtime_ns: current_mtime,
        dirs,
        files,
    };
    cache.set_dir_listing(rel_dir, listing.clone());
    Ok(listing)
}

/// Files worth pushing: Markdown, or an extension from the code table.
/// Image files are skipped entirely.
pub(crate) fn is_pushable_file(name: &str) -> bool {
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if is_image_extension(ext) {
        return false;
    }
    ext.eq_ignore_ascii_case("md") || language_for_extension(ext).is_some()
}

/// Page title for a file: the stem, except YAML files which keep their
/// extension (so `config.yaml` and `config.yml` stay distinguishable).
fn file_title(name: &str) -> String {
    let path = Path::new(name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if ext == "yaml" || ext == "yml" {
        name.to_string()
    } else {
        path.file_stem()
            .map_or_else(|| name.to_string(), |s| s.to_string_lossy().to_string())
    }
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn clamped_mtime(path: &Path) -> u64 {
    u64::try_from(mtime_ns(path)).unwrap_or(u64::MAX)
}

/// Flat-mode plan: every `*.md` directly under the project root, ordered
/// parents-first using front-matter parent ids.
fn plan_flat(project_dir: &Path, index: &Index, opts: PushOptions) -> Result<Vec<PlanItem>> {
    let mut entries: Vec<(String, Option<String>, Option<String>)> = Vec::new();
    let mut parent_of: HashMap<String, String> = HashMap::new();

    for entry in fs::read_dir(project_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !name.ends_with(".md") || !entry.file_type()?.is_file() {
            continue;
        }
        if index.is_ignored(&name, false) {
            continue;
        }
        let content = fs::read_to_string(entry.path())?;
        let fm = parse_flat_frontmatter(&content);
        let page_id = fm.as_ref().map(|f| resolver::dashed_id(&f.page_id));
        let parent_id = fm.as_ref().and_then(|f| f.parent_id.clone());
        if let (Some(pid), Some(parent)) = (&page_id, &parent_id) {
            parent_of.insert(pid.clone(), resolver::dashed_id(parent));
        }
        entries.push((name, page_id, parent_id));
    }

    // Parents before children: sort by hierarchy depth
    let depth = |mut id: Option<String>| -> usize {
        let mut seen = 0usize;
        while let Some(current) = id {
            if seen > 32 {
                break;
            }
            seen += 1;
            id = parent_of.get(&current).cloned();
        }
        seen
    };
    entries.sort_by_key(|(name, page_id, _)| (depth(page_id.clone()), name.clone()));

    let mut plan = Vec::new();
    for (name, fm_page_id, _) in entries {
        let abs_path = project_dir.join(&name);
        let bytes = fs::read(&abs_path)?;
        let sha1 = sha1_hex(&bytes);
        let known = index.get(&name);
        // A page id in the index or in the document's own front-matter
        // makes this an update
        let page_id = known.map(|r| r.page_id.clone()).or(fm_page_id);
        let action = if page_id.is_none() {
            PushAction::CreateFile
        } else if opts.force_all
            || known.is_none()
            || known.and_then(|r| r.content_sha1.as_deref()) != Some(sha1.as_str())
        {
            PushAction::UpdateFile
        } else {
            PushAction::SkipFile
        };
        plan.push(PlanItem {
            rel_path: name.clone(),
            parent_rel: String::new(),
            title: flat_title(&name),
            action,
            page_id,
            sha1: Some(sha1),
            mtime_ns: clamped_mtime(&abs_path),
        });
    }
    Ok(plan)
}

/// Flat-mode title: the stem with any `_<id8>` disambiguation suffix
/// stripped.
fn flat_title(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().to_string());
    if let Some((base, suffix)) = stem.rsplit_once('_') {
        if suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return base.to_string();
        }
    }
    stem
}

// ── Execution ─────────────────────────────────────────────────

struct FilePush {
    item: PlanItem,
    parent_id: String,
}

struct FileResult {
    rel_path: String,
    outcome: Outcome,
    page_id: String,
    page_url: String,
    parent_id: String,
    title: String,
    last_edited: Option<String>,
    sha1: Option<String>,
    mtime_ns: u64,
}

async fn execute(
    project_dir: &Path,
    cfg: &ProjectConfig,
    client: &NotionClient,
    index: &mut Index,
    root_id: &str,
    plan: Vec<PlanItem>,
    report: &mut Report,
) -> Result<()> {
    let cancel = cancel_flag();

    // Known directory pages, seeded from the index
    let mut dir_pages: HashMap<String, String> = HashMap::new();
    dir_pages.insert(String::new(), root_id.to_string());
    for (rel, record) in index.iter() {
        if record.kind == RecordKind::Directory {
            dir_pages.insert(rel.clone(), record.page_id.clone());
        }
    }

    let (dir_items, file_items): (Vec<_>, Vec<_>) = plan.into_iter().partition(|i| {
        matches!(
            i.action,
            PushAction::CreateDirectory | PushAction::SkipDirectoryUpdate
        )
    });

    // Directories first, serially and top-down: children need their
    // parent's page id
    for item in dir_items {
        if cancel.load(Ordering::Relaxed) {
            info!("interrupted; stopping before new directory work");
            break;
        }
        match item.action {
            PushAction::CreateDirectory => {
                let Some(parent_id) = dir_pages.get(&item.parent_rel).cloned() else {
                    report.record_error(
                        item.rel_path.clone(),
                        &Error::InvariantViolation(format!(
                            "parent page unknown for '{}'",
                            item.rel_path
                        )),
                    );
                    continue;
                };
                match ensure_directory_page(client, &parent_id, &item.title).await {
                    Ok(page_id) => {
                        let mut record = IndexRecord::new(
                            RecordKind::Directory,
                            page_id.clone(),
                            NotionClient::page_url(&page_id),
                        );
                        record.parent_id = Some(parent_id);
                        record.title = Some(item.title.clone());
                        record.last_sync_at = Some(Utc::now().to_rfc3339());
                        let url = record.page_url.clone();
                        if let Err(e) = index.put(&item.rel_path, record) {
                            report.record_error(item.rel_path.clone(), &e);
                            continue;
                        }
                        dir_pages.insert(item.rel_path.clone(), page_id);
                        report.record(item.rel_path.clone(), Outcome::Created, Some(url));
                    }
                    Err(e) => report.record_error(item.rel_path.clone(), &e),
                }
            }
            _ => {
                report.record(item.rel_path.clone(), Outcome::Skipped, None);
            }
        }
    }

    // Files fan out through the worker pool; each page is owned by one
    // worker so its delete/append sequence stays serialized
    let mut jobs = Vec::new();
    for item in file_items {
        if item.action == PushAction::SkipFile {
            report.record(item.rel_path.clone(), Outcome::Skipped, None);
            continue;
        }
        let parent_id = if cfg.sync_mode == SyncMode::Flat {
            flat_parent_id(project_dir, &item.rel_path, index, root_id)
        } else {
            dir_pages.get(&item.parent_rel).cloned()
        };
        let Some(parent_id) = parent_id else {
            report.record_error(
                item.rel_path.clone(),
                &Error::InvariantViolation(format!("parent page unknown for '{}'", item.rel_path)),
            );
            continue;
        };
        jobs.push(FilePush { item, parent_id });
    }

    let results = stream::iter(jobs.into_iter().map(|job| {
        let cancel = Arc::clone(&cancel);
        async move {
            let rel = job.item.rel_path.clone();
            if cancel.load(Ordering::Relaxed) {
                return (rel, Err(Error::Other("interrupted".into())));
            }
            let result = push_file(project_dir, client, job).await;
            (rel, result)
        }
    }))
    .buffer_unordered(cfg.parallelism.max(1))
    .collect::<Vec<_>>()
    .await;

    for (rel_path, result) in results {
        match result {
            Ok(file) => {
                let mut record = IndexRecord::new(
                    record_kind_for_mode(cfg.sync_mode),
                    file.page_id.clone(),
                    file.page_url.clone(),
                );
                record.parent_id = Some(file.parent_id.clone());
                record.title = Some(file.title.clone());
                record.content_sha1 = file.sha1.clone();
                record.local_mtime_ns = Some(file.mtime_ns);
                record.remote_last_edited = file.last_edited.clone();
                record.last_sync_at = Some(Utc::now().to_rfc3339());
                match index.put(&file.rel_path, record) {
                    Ok(()) => {
                        report.record(file.rel_path, file.outcome, Some(file.page_url));
                    }
                    Err(e) => report.record_error(file.rel_path, &e),
                }
            }
            Err(e) => report.record_error(rel_path, &e),
        }
    }

    Ok(())
}

const fn record_kind_for_mode(mode: SyncMode) -> RecordKind {
    match mode {
        SyncMode::Hierarchy => RecordKind::File,
        SyncMode::Flat => RecordKind::Page,
    }
}

/// Find or create the folder page backing a directory.
async fn ensure_directory_page(
    client: &NotionClient,
    parent_id: &str,
    title: &str,
) -> Result<String> {
    if let Some(existing) = client.find_child_page_by_title(parent_id, title).await? {
        debug!(title, "adopting existing directory page");
        return Ok(existing);
    }
    let page = client.create_child_page(parent_id, title, Some("📁")).await?;
    Ok(resolver::dashed_id(&page.id))
}

async fn push_file(
    project_dir: &Path,
    client: &NotionClient,
    job: FilePush,
) -> Result<FileResult> {
    let item = job.item;
    let abs_path = project_dir.join(&item.rel_path);
    let content = fs::read_to_string(&abs_path)?;
    let blocks = convert_file(&item.rel_path, &content);

    match item.action {
        PushAction::CreateFile => {
            let page = client
                .create_child_page(&job.parent_id, &item.title, Some("📄"))
                .await?;
            let page_id = resolver::dashed_id(&page.id);
            client.append_blocks(&page_id, &blocks).await?;
            let last_edited = client.get_last_edited_time(&page_id).await.ok();
            Ok(FileResult {
                rel_path: item.rel_path,
                outcome: Outcome::Created,
                page_url: NotionClient::page_url(&page_id),
                page_id,
                parent_id: job.parent_id,
                title: item.title,
                last_edited,
                sha1: item.sha1,
                mtime_ns: item.mtime_ns,
            })
        }
        PushAction::UpdateFile => {
            let page_id = item
                .page_id
                .clone()
                .ok_or_else(|| Error::Other(format!("no page id for '{}'", item.rel_path)))?;
            client.clear_children(&page_id).await?;
            client.append_blocks(&page_id, &blocks).await?;
            let last_edited = client.get_last_edited_time(&page_id).await.ok();
            Ok(FileResult {
                rel_path: item.rel_path,
                outcome: Outcome::Updated,
                page_url: NotionClient::page_url(&page_id),
                page_id,
                parent_id: job.parent_id,
                title: item.title,
                last_edited,
                sha1: item.sha1,
                mtime_ns: item.mtime_ns,
            })
        }
        _ => Err(Error::Other("not a file action".into())),
    }
}

/// Convert a local file into its block list.
fn convert_file(rel_path: &str, content: &str) -> Vec<Block> {
    let ext = Path::new(rel_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match language_for_extension(ext) {
        Some(language) => code_file_to_blocks(content, language),
        None => markdown_to_blocks(content),
    }
}

/// Flat mode: the parent page id from front-matter, else the root.
fn flat_parent_id(
    project_dir: &Path,
    rel_path: &str,
    index: &Index,
    root_id: &str,
) -> Option<String> {
    let content = fs::read_to_string(project_dir.join(rel_path)).ok()?;
    let fm = parse_flat_frontmatter(&content);
    let parent = fm
        .and_then(|f| f.parent_id)
        .map(|p| resolver::dashed_id(&p))
        .unwrap_or_else(|| root_id.to_string());
    // A parent that is not the root must already be known (pushed or
    // pulled earlier); otherwise fall back to the root
    if parent == root_id || index.contains_page(&parent) {
        Some(parent)
    } else {
        Some(root_id.to_string())
    }
}

/// Flag flipped by Ctrl-C: the driver stops enqueuing new work and
/// drains what is in flight, so the index still reflects everything
/// committed remotely.
pub(crate) fn cancel_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let listener = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            listener.store(true, Ordering::Relaxed);
        }
    });
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plan_for(files: &[(&str, &str)], records: &[(&str, RecordKind, Option<&str>)]) -> Vec<PlanItem> {
        let temp_dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = temp_dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        for (rel, kind, sha) in records {
            let mut record = IndexRecord::new(
                *kind,
                format!("id-{rel}"),
                format!("https://www.notion.so/{rel}"),
            );
            record.content_sha1 = sha.map(String::from);
            index.put(rel, record).unwrap();
        }
        let mut cache = Cache::load(temp_dir.path());
        plan_hierarchy(temp_dir.path(), &index, &mut cache, PushOptions::default()).unwrap()
    }

    fn action_of<'a>(plan: &'a [PlanItem], rel: &str) -> &'a PushAction {
        &plan.iter().find(|i| i.rel_path == rel).unwrap().action
    }

    #[test]
    fn test_new_file_is_created() {
        let plan = plan_for(&[("README.md", "# Hi\nhello\n")], &[]);
        assert_eq!(*action_of(&plan, "README.md"), PushAction::CreateFile);
    }

    #[test]
    fn test_unchanged_file_is_skipped() {
        let sha = sha1_hex(b"# Hi\nhello\n");
        let plan = plan_for(
            &[("README.md", "# Hi\nhello\n")],
            &[("README.md", RecordKind::File, Some(sha.as_str()))],
        );
        assert_eq!(*action_of(&plan, "README.md"), PushAction::SkipFile);
    }

    #[test]
    fn test_changed_file_is_updated() {
        let plan = plan_for(
            &[("README.md", "# Hi\nchanged\n")],
            &[("README.md", RecordKind::File, Some("stale-sha"))],
        );
        assert_eq!(*action_of(&plan, "README.md"), PushAction::UpdateFile);
    }

    #[test]
    fn test_push_is_idempotent_in_plan_terms() {
        // Second plan over an unchanged tree yields only skips
        let content = "# Hi\nhello\n";
        let sha = sha1_hex(content.as_bytes());
        let plan = plan_for(
            &[("a.md", content), ("b.md", content)],
            &[
                ("a.md", RecordKind::File, Some(sha.as_str())),
                ("b.md", RecordKind::File, Some(sha.as_str())),
            ],
        );
        assert!(plan.iter().all(|i| i.action == PushAction::SkipFile));
    }

    #[test]
    fn test_directories_precede_their_contents() {
        let plan = plan_for(&[("docs/api.md", "x\n")], &[]);
        let dir_pos = plan.iter().position(|i| i.rel_path == "docs").unwrap();
        let file_pos = plan
            .iter()
            .position(|i| i.rel_path == "docs/api.md")
            .unwrap();
        assert!(dir_pos < file_pos);
        assert_eq!(*action_of(&plan, "docs"), PushAction::CreateDirectory);
    }

    #[test]
    fn test_creations_precede_updates_within_directory() {
        let plan = plan_for(
            &[("old.md", "changed\n"), ("new.md", "fresh\n")],
            &[("old.md", RecordKind::File, Some("stale"))],
        );
        let new_pos = plan.iter().position(|i| i.rel_path == "new.md").unwrap();
        let old_pos = plan.iter().position(|i| i.rel_path == "old.md").unwrap();
        assert!(new_pos < old_pos);
    }

    #[test]
    fn test_hidden_and_image_files_are_not_enumerated() {
        let plan = plan_for(
            &[
                (".hidden.md", "x\n"),
                ("logo.png", "x"),
                ("notes.md", "x\n"),
            ],
            &[],
        );
        assert!(plan.iter().all(|i| i.rel_path != ".hidden.md"));
        assert!(plan.iter().all(|i| i.rel_path != "logo.png"));
        assert!(plan.iter().any(|i| i.rel_path == "notes.md"));
    }

    #[test]
    fn test_ignored_paths_are_excluded() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".c2n_ignore"), "drafts/\n*.log.md\n").unwrap();
        fs::create_dir_all(temp_dir.path().join("drafts")).unwrap();
        fs::write(temp_dir.path().join("drafts/wip.md"), "x\n").unwrap();
        fs::write(temp_dir.path().join("debug.log.md"), "x\n").unwrap();
        fs::write(temp_dir.path().join("keep.md"), "x\n").unwrap();

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let mut cache = Cache::load(temp_dir.path());
        let plan =
            plan_hierarchy(temp_dir.path(), &index, &mut cache, PushOptions::default()).unwrap();

        assert!(plan.iter().all(|i| !i.rel_path.starts_with("drafts")));
        assert!(plan.iter().all(|i| i.rel_path != "debug.log.md"));
        assert!(plan.iter().any(|i| i.rel_path == "keep.md"));
    }

    #[test]
    fn test_force_all_turns_skips_into_updates() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.md"), "same\n").unwrap();
        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let mut record = IndexRecord::new(
            RecordKind::File,
            "id-a".into(),
            "https://www.notion.so/ida".into(),
        );
        record.content_sha1 = Some(sha1_hex(b"same\n"));
        index.put("a.md", record).unwrap();

        let mut cache = Cache::load(temp_dir.path());
        let plan = plan_hierarchy(
            temp_dir.path(),
            &index,
            &mut cache,
            PushOptions {
                force_all: true,
                ..PushOptions::default()
            },
        )
        .unwrap();
        assert_eq!(*action_of(&plan, "a.md"), PushAction::UpdateFile);
    }

    #[test]
    fn test_file_title_rules() {
        assert_eq!(file_title("README.md"), "README");
        assert_eq!(file_title("deploy.yaml"), "deploy.yaml");
        assert_eq!(file_title("deploy.yml"), "deploy.yml");
        assert_eq!(file_title("script.py"), "script");
    }

    #[test]
    fn test_flat_title_strips_id_suffix() {
        assert_eq!(flat_title("Notes_27db1a4f.md"), "Notes");
        assert_eq!(flat_title("Notes.md"), "Notes");
        assert_eq!(flat_title("keep_under.md"), "keep_under");
    }

    #[test]
    fn test_pushable_file_extensions() {
        assert!(is_pushable_file("a.md"));
        assert!(is_pushable_file("a.rs"));
        assert!(is_pushable_file("a.sql"));
        assert!(!is_pushable_file("a.png"));
        assert!(!is_pushable_file("a.txt"));
        assert!(!is_pushable_file("Makefile"));
    }
}
