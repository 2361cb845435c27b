//! Pull engine: remote pages → local tree.
//!
//! Two composable submodes:
//!
//! - **Change pull** (`--existing-only`): fetch `last_edited_time` for
//!   every indexed page in parallel; pages edited since the recorded
//!   timestamp are rendered into the staging area.
//! - **New pull** (`--new-only`): enumerate the remote subtree
//!   breadth-first; pages absent from the index become new local files
//!   (or directories) under the active projection.
//!
//! The default runs both, then merges the staging area onto the working
//! tree. `--dry-run` stops after enumerating the plan; nothing local or
//! remote changes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::cache::{Cache, RemotePageEntry, RemoteTreeSnapshot};
use crate::config::{self, pull_latest_dir, ProjectConfig, SyncMode};
use crate::convert::PageRenderer;
use crate::error::{Error, Result};
use crate::hash::{mtime_ns, sha1_hex};
use crate::index::{Index, IndexRecord, RecordKind};
use crate::merge::{merge_pair, MergeStatus};
use crate::notion::types::{Block, BlockPayload};
use crate::notion::NotionClient;
use crate::projection::{flat_filename, hierarchy_rel_path, FlatFrontmatter};
use crate::report::{Outcome, Report};
use crate::resolver::{self, extract_page_id};

/// Options for one pull run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    pub new_only: bool,
    pub existing_only: bool,
    pub dry_run: bool,
    pub force_all: bool,
    pub verbose: bool,
}

/// A page staged for merge, with the metadata its index record needs.
#[derive(Debug, Clone)]
struct StagedPage {
    rel_path: String,
    page_id: String,
    parent_id: Option<String>,
    title: String,
    remote_last_edited: Option<String>,
    kind: RecordKind,
    is_new: bool,
}

/// Run a pull for the project at `project_dir`.
///
/// # Errors
///
/// Returns command-fatal errors only; per-item failures land in the
/// returned report.
pub fn run(project_dir: &Path, opts: PullOptions) -> Result<Report> {
    config::load_env_for_project(project_dir);
    let cfg = ProjectConfig::load(project_dir)?;
    let mut index = Index::load(project_dir, cfg.sync_mode)?;
    let mut cache = Cache::load(project_dir);

    let root_url = resolver::resolve_root_url(&cfg, &index)?;
    let root_id = extract_page_id(&root_url)?;

    let token = config::notion_token()?;
    let client = NotionClient::new(token, cfg.parallelism)?;

    let mut report = Report::new();
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("cannot create async runtime: {e}")))?;
    runtime.block_on(execute(
        project_dir,
        &cfg,
        &client,
        &mut index,
        &mut cache,
        &root_id,
        opts,
        &mut report,
    ))?;

    if !opts.dry_run {
        index.save()?;
    }
    cache.save();
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn execute(
    project_dir: &Path,
    cfg: &ProjectConfig,
    client: &NotionClient,
    index: &mut Index,
    cache: &mut Cache,
    root_id: &str,
    opts: PullOptions,
    report: &mut Report,
) -> Result<()> {
    let staging = pull_latest_dir(project_dir);
    if !opts.dry_run {
        prepare_staging(&staging)?;
    }

    let mut staged: Vec<StagedPage> = Vec::new();

    let run_change = !opts.new_only;
    let run_new = !opts.existing_only;

    if run_change {
        change_pull(cfg, client, index, &staging, opts, &mut staged, report).await?;
    }
    if run_new {
        new_pull(
            project_dir, cfg, client, index, cache, root_id, &staging, opts, &mut staged, report,
        )
        .await?;
    }

    if opts.dry_run {
        for page in &staged {
            println!(
                "{:>10}  {}",
                if page.is_new { "new" } else { "changed" },
                page.rel_path
            );
            report.record(page.rel_path.clone(), Outcome::Planned, None);
        }
        return Ok(());
    }

    apply_merge(project_dir, &staging, index, &staged, report)?;
    Ok(())
}

/// Reset `.c2n/pull/latest/` for a fresh pull.
fn prepare_staging(staging: &Path) -> Result<()> {
    if staging.is_dir() {
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir_all(staging)?;
    Ok(())
}

// ── Change pull ───────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn change_pull(
    cfg: &ProjectConfig,
    client: &NotionClient,
    index: &Index,
    staging: &Path,
    opts: PullOptions,
    staged: &mut Vec<StagedPage>,
    report: &mut Report,
) -> Result<()> {
    let candidates: Vec<(String, IndexRecord)> = index
        .iter()
        .filter(|(rel, record)| {
            !rel.is_empty() && record.kind != RecordKind::Directory && !record.page_id.is_empty()
        })
        .map(|(rel, record)| (rel.clone(), record.clone()))
        .collect();

    // Parallel last-edited probes
    let probes = stream::iter(candidates.into_iter().map(|(rel, record)| async move {
        let result = client.get_last_edited_time(&record.page_id).await;
        (rel, record, result)
    }))
    .buffer_unordered(cfg.parallelism.max(1))
    .collect::<Vec<_>>()
    .await;

    for (rel, record, result) in probes {
        match result {
            Ok(last_edited) => {
                let newer = is_newer(&last_edited, record.remote_last_edited.as_deref());
                if !(newer || opts.force_all) {
                    report.record(rel, Outcome::Skipped, Some(record.page_url.clone()));
                    continue;
                }
                if opts.dry_run {
                    staged.push(StagedPage {
                        rel_path: rel,
                        page_id: record.page_id.clone(),
                        parent_id: record.parent_id.clone(),
                        title: record.title.clone().unwrap_or_default(),
                        remote_last_edited: Some(last_edited),
                        kind: record.kind,
                        is_new: false,
                    });
                    continue;
                }
                debug!(rel = %rel, last_edited = %last_edited, "remote page changed; rendering");
                match render_to_staging(cfg, client, staging, &rel, &record.page_id).await {
                    Ok(parent_id) => staged.push(StagedPage {
                        rel_path: rel,
                        page_id: record.page_id.clone(),
                        parent_id: parent_id.or(record.parent_id.clone()),
                        title: record.title.clone().unwrap_or_default(),
                        remote_last_edited: Some(last_edited),
                        kind: record.kind,
                        is_new: false,
                    }),
                    Err(e) => report.record_error(rel, &e),
                }
            }
            Err(e) => report.record_error(rel, &e),
        }
    }
    Ok(())
}

/// Render one known page into the staging area. Returns the parent id
/// when it was (re)fetched for front-matter.
async fn render_to_staging(
    cfg: &ProjectConfig,
    client: &NotionClient,
    staging: &Path,
    rel_path: &str,
    page_id: &str,
) -> Result<Option<String>> {
    let renderer = PageRenderer::new(client);
    let blocks = client.get_child_blocks(page_id).await?;
    let children_ids = child_page_ids(&blocks);
    let body = renderer.render_blocks(content_blocks(blocks)).await?;

    let (text, parent_id) = if cfg.sync_mode == SyncMode::Flat {
        let page = client.retrieve_page(page_id).await?;
        let parent_id = page.parent_page_id().map(resolver::dashed_id);
        let fm = FlatFrontmatter {
            page_id: resolver::dashed_id(page_id),
            page_url: NotionClient::page_url(page_id),
            parent_id: parent_id.clone(),
            parent_type: parent_id.is_some().then(|| "page".to_string()),
            children_ids,
            sync_mode: "flat".into(),
        };
        (format!("{}{body}", fm.render()), parent_id)
    } else {
        (body, None)
    };

    let target = staging.join(rel_path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, text)?;
    Ok(parent_id)
}

// ── New pull ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn new_pull(
    project_dir: &Path,
    cfg: &ProjectConfig,
    client: &NotionClient,
    index: &mut Index,
    cache: &mut Cache,
    root_id: &str,
    staging: &Path,
    opts: PullOptions,
    staged: &mut Vec<StagedPage>,
    report: &mut Report,
) -> Result<()> {
    let tree = remote_tree(client, cache, root_id).await?;

    // Where each known page's children land
    let mut dir_map: HashMap<String, String> = HashMap::new();
    dir_map.insert(root_id.to_string(), String::new());
    let mut known_pages: HashSet<String> = HashSet::new();
    for (rel, record) in index.iter() {
        known_pages.insert(record.page_id.clone());
        match record.kind {
            RecordKind::Directory => {
                dir_map.insert(record.page_id.clone(), rel.clone());
            }
            _ => {
                let parent_rel = Path::new(rel)
                    .parent()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default();
                dir_map.insert(record.page_id.clone(), parent_rel);
            }
        }
    }

    let mut taken_names: HashSet<String> = index.iter().map(|(rel, _)| rel.clone()).collect();

    let cancel = crate::push::cancel_flag();
    for entry in &tree.pages {
        if cancel.load(std::sync::atomic::Ordering::Relaxed) {
            info!("interrupted; keeping pages already staged");
            break;
        }
        if entry.page_id == root_id || known_pages.contains(&entry.page_id) {
            continue;
        }
        info!(title = %entry.title, "new remote page");
        let result = pull_new_page(
            project_dir,
            cfg,
            client,
            index,
            staging,
            &mut dir_map,
            &mut taken_names,
            entry,
            opts,
            staged,
        )
        .await;
        if let Err(e) = result {
            report.record_error(format!("page:{}", entry.page_id), &e);
        }
    }
    Ok(())
}

/// Breadth-first remote subtree enumeration, cached between runs.
async fn remote_tree(
    client: &NotionClient,
    cache: &mut Cache,
    root_id: &str,
) -> Result<RemoteTreeSnapshot> {
    let now = Utc::now();
    if let Some(snapshot) = cache.fresh_remote_tree(now) {
        debug!("using cached remote tree snapshot");
        return Ok(snapshot.clone());
    }

    let mut pages = Vec::new();
    let mut queue: VecDeque<(String, Option<String>, String)> =
        VecDeque::from([(root_id.to_string(), None, String::new())]);
    let mut seen: HashSet<String> = HashSet::new();

    while let Some((page_id, parent_id, title)) = queue.pop_front() {
        if !seen.insert(page_id.clone()) {
            continue;
        }
        let blocks = client.get_child_blocks(&page_id).await?;
        let children: Vec<(String, String)> = blocks
            .iter()
            .filter_map(|b| match &b.payload {
                BlockPayload::ChildPage { child_page } => b
                    .id
                    .as_ref()
                    .map(|id| (resolver::dashed_id(id), child_page.title.clone())),
                _ => None,
            })
            .collect();

        pages.push(RemotePageEntry {
            page_id: page_id.clone(),
            title,
            parent_id,
            has_children: !children.is_empty(),
        });
        for (child_id, child_title) in children {
            queue.push_back((child_id, Some(page_id.clone()), child_title));
        }
    }

    let snapshot = RemoteTreeSnapshot {
        captured_at: now.to_rfc3339(),
        pages,
    };
    cache.set_remote_tree(snapshot.clone());
    Ok(snapshot)
}

#[allow(clippy::too_many_arguments)]
async fn pull_new_page(
    project_dir: &Path,
    cfg: &ProjectConfig,
    client: &NotionClient,
    index: &mut Index,
    staging: &Path,
    dir_map: &mut HashMap<String, String>,
    taken_names: &mut HashSet<String>,
    entry: &RemotePageEntry,
    opts: PullOptions,
    staged: &mut Vec<StagedPage>,
) -> Result<()> {
    let parent_rel = entry
        .parent_id
        .as_ref()
        .and_then(|p| dir_map.get(p).cloned())
        .unwrap_or_default();

    let blocks = client.get_child_blocks(&entry.page_id).await?;
    let children_ids = child_page_ids(&blocks);
    let content = content_blocks(blocks);
    let dir_like = cfg.sync_mode == SyncMode::Hierarchy
        && !children_ids.is_empty()
        && content.is_empty();

    if dir_like {
        let rel = hierarchy_rel_path(&parent_rel, &entry.title, true);
        dir_map.insert(entry.page_id.clone(), rel.clone());
        if !opts.dry_run {
            fs::create_dir_all(project_dir.join(&rel))?;
            let mut record = IndexRecord::new(
                RecordKind::Directory,
                entry.page_id.clone(),
                NotionClient::page_url(&entry.page_id),
            );
            record.parent_id = entry.parent_id.clone();
            record.title = Some(entry.title.clone());
            record.last_sync_at = Some(Utc::now().to_rfc3339());
            index.put(&rel, record)?;
        }
        staged.push(StagedPage {
            rel_path: rel,
            page_id: entry.page_id.clone(),
            parent_id: entry.parent_id.clone(),
            title: entry.title.clone(),
            remote_last_edited: None,
            kind: RecordKind::Directory,
            is_new: true,
        });
        return Ok(());
    }

    let rel = match cfg.sync_mode {
        SyncMode::Hierarchy => hierarchy_rel_path(&parent_rel, &entry.title, false),
        SyncMode::Flat => flat_filename(&entry.title, &entry.page_id, taken_names),
    };
    taken_names.insert(rel.clone());
    // Children of a content page land next to it
    dir_map.insert(entry.page_id.clone(), parent_rel);

    let renderer = PageRenderer::new(client);
    let body = renderer.render_blocks(content).await?;
    let last_edited = client.get_last_edited_time(&entry.page_id).await.ok();

    let text = if cfg.sync_mode == SyncMode::Flat {
        let fm = FlatFrontmatter {
            page_id: entry.page_id.clone(),
            page_url: NotionClient::page_url(&entry.page_id),
            parent_id: entry.parent_id.clone(),
            parent_type: entry.parent_id.is_some().then(|| "page".to_string()),
            children_ids,
            sync_mode: "flat".into(),
        };
        format!("{}{body}", fm.render())
    } else {
        body
    };

    if !opts.dry_run {
        let target = staging.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, text)?;
    }

    staged.push(StagedPage {
        rel_path: rel,
        page_id: entry.page_id.clone(),
        parent_id: entry.parent_id.clone(),
        title: entry.title.clone(),
        remote_last_edited: last_edited,
        kind: record_kind_for_mode(cfg.sync_mode),
        is_new: true,
    });
    Ok(())
}

const fn record_kind_for_mode(mode: SyncMode) -> RecordKind {
    match mode {
        SyncMode::Hierarchy => RecordKind::File,
        SyncMode::Flat => RecordKind::Page,
    }
}

// ── Merge apply ───────────────────────────────────────────────

fn apply_merge(
    project_dir: &Path,
    staging: &Path,
    index: &mut Index,
    staged: &[StagedPage],
    report: &mut Report,
) -> Result<()> {
    for page in staged {
        if page.kind == RecordKind::Directory {
            report.record(
                page.rel_path.clone(),
                Outcome::Created,
                Some(NotionClient::page_url(&page.page_id)),
            );
            continue;
        }

        let staged_path = staging.join(&page.rel_path);
        let remote_text = match fs::read_to_string(&staged_path) {
            Ok(text) => text,
            Err(e) => {
                report.record_error(page.rel_path.clone(), &Error::Io(e));
                continue;
            }
        };

        let target = project_dir.join(&page.rel_path);
        let local_text = fs::read_to_string(&target).ok();
        let outcome = merge_pair(local_text.as_deref(), &remote_text);

        if let Some(content) = &outcome.content {
            if let Some(parent) = target.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    report.record_error(page.rel_path.clone(), &Error::Io(e));
                    continue;
                }
            }
            if let Err(e) = fs::write(&target, content) {
                report.record_error(page.rel_path.clone(), &Error::Io(e));
                continue;
            }
        }

        if let Err(e) = update_record_after_pull(index, page, &target) {
            report.record_error(page.rel_path.clone(), &e);
            continue;
        }

        match outcome.status {
            MergeStatus::Same => {
                report.record(page.rel_path.clone(), Outcome::Skipped, None);
            }
            MergeStatus::Add | MergeStatus::Replace => {
                report.record(
                    page.rel_path.clone(),
                    if page.is_new {
                        Outcome::Created
                    } else {
                        Outcome::Updated
                    },
                    Some(NotionClient::page_url(&page.page_id)),
                );
            }
            MergeStatus::Update => {
                if outcome.conflicts > 0 {
                    report.record_conflict(page.rel_path.clone(), outcome.conflicts);
                } else {
                    report.record(page.rel_path.clone(), Outcome::Merged, None);
                }
            }
        }
    }
    Ok(())
}

/// Refresh (or create) the index record for a pulled file.
fn update_record_after_pull(index: &mut Index, page: &StagedPage, target: &Path) -> Result<()> {
    let final_bytes = fs::read(target).unwrap_or_default();
    let now = Utc::now();
    let last_sync_at = last_sync_timestamp(now, page.remote_last_edited.as_deref());

    let mut record = match index.get(&page.rel_path) {
        Some(existing) => existing.clone(),
        None => {
            let mut record = IndexRecord::new(
                page.kind,
                page.page_id.clone(),
                NotionClient::page_url(&page.page_id),
            );
            record.parent_id = page.parent_id.clone();
            record.title = if page.title.is_empty() {
                None
            } else {
                Some(page.title.clone())
            };
            record
        }
    };
    record.content_sha1 = Some(sha1_hex(&final_bytes));
    record.local_mtime_ns = u64::try_from(mtime_ns(target)).ok();
    if page.remote_last_edited.is_some() {
        record.remote_last_edited = page.remote_last_edited.clone();
    }
    record.last_sync_at = Some(last_sync_at);
    index.put(&page.rel_path, record)
}

/// `last_sync_at` never precedes the remote edit stamp it acknowledges,
/// even under clock skew.
fn last_sync_timestamp(now: DateTime<Utc>, remote_last_edited: Option<&str>) -> String {
    if let Some(remote) = remote_last_edited {
        if let Ok(remote_ts) = DateTime::parse_from_rfc3339(remote) {
            if remote_ts.with_timezone(&Utc) > now {
                return remote.to_string();
            }
        }
    }
    now.to_rfc3339()
}

/// Whether a fetched `last_edited_time` is newer than the recorded one.
fn is_newer(fetched: &str, recorded: Option<&str>) -> bool {
    let Some(recorded) = recorded else {
        return true;
    };
    match (
        DateTime::parse_from_rfc3339(fetched),
        DateTime::parse_from_rfc3339(recorded),
    ) {
        (Ok(f), Ok(r)) => f > r,
        _ => fetched != recorded,
    }
}

/// Ids of child pages referenced by a block list.
fn child_page_ids(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|b| match &b.payload {
            BlockPayload::ChildPage { .. } => b.id.as_ref().map(|id| resolver::dashed_id(id)),
            _ => None,
        })
        .collect()
}

/// Blocks that are page content (everything except child-page stubs).
fn content_blocks(blocks: Vec<Block>) -> Vec<Block> {
    blocks
        .into_iter()
        .filter(|b| !matches!(b.payload, BlockPayload::ChildPage { .. }))
        .collect()
}

/// The staging path for a relative path (exposed for tests).
#[must_use]
pub fn staging_path(project_dir: &Path, rel_path: &str) -> PathBuf {
    pull_latest_dir(project_dir).join(rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_newer_timestamp_comparison() {
        assert!(is_newer("2025-02-01T00:00:00.000Z", None));
        assert!(is_newer(
            "2025-02-01T00:00:00.000Z",
            Some("2025-01-01T00:00:00.000Z")
        ));
        assert!(!is_newer(
            "2025-01-01T00:00:00.000Z",
            Some("2025-01-01T00:00:00.000Z")
        ));
        assert!(!is_newer(
            "2025-01-01T00:00:00.000Z",
            Some("2025-02-01T00:00:00.000Z")
        ));
    }

    #[test]
    fn test_is_newer_handles_offset_forms() {
        assert!(is_newer(
            "2025-02-01T01:00:00.000+01:00",
            Some("2025-01-31T23:00:00.000Z")
        ));
    }

    #[test]
    fn test_last_sync_at_never_precedes_remote_edit() {
        let now = Utc::now();
        let future_remote = (now + chrono::Duration::minutes(5)).to_rfc3339();
        let stamped = last_sync_timestamp(now, Some(&future_remote));
        assert_eq!(stamped, future_remote);

        let past_remote = (now - chrono::Duration::minutes(5)).to_rfc3339();
        let stamped = last_sync_timestamp(now, Some(&past_remote));
        assert_eq!(stamped, now.to_rfc3339());
    }

    #[test]
    fn test_prepare_staging_clears_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let staging = pull_latest_dir(temp_dir.path());
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("stale.md"), "old\n").unwrap();

        prepare_staging(&staging).unwrap();
        assert!(staging.exists());
        assert!(!staging.join("stale.md").exists());
    }

    #[test]
    fn test_apply_merge_writes_and_updates_record() {
        let temp_dir = TempDir::new().unwrap();
        let staging = pull_latest_dir(temp_dir.path());
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("README.md"), "A\nB\n").unwrap();
        fs::write(temp_dir.path().join("README.md"), "A\n").unwrap();

        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let staged = vec![StagedPage {
            rel_path: "README.md".into(),
            page_id: "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234".into(),
            parent_id: None,
            title: "README".into(),
            remote_last_edited: Some("2025-03-01T00:00:00.000Z".into()),
            kind: RecordKind::File,
            is_new: false,
        }];
        let mut report = Report::new();
        apply_merge(temp_dir.path(), &staging, &mut index, &staged, &mut report).unwrap();

        // Remote-only addition is adopted silently
        let written = fs::read_to_string(temp_dir.path().join("README.md")).unwrap();
        assert_eq!(written, "A\nB\n");

        let record = index.get("README.md").unwrap();
        assert_eq!(record.content_sha1.as_deref(), Some(&*sha1_hex(b"A\nB\n")));
        assert_eq!(
            record.remote_last_edited.as_deref(),
            Some("2025-03-01T00:00:00.000Z")
        );
        assert!(!report.has_fatal());
    }

    #[test]
    fn test_apply_merge_second_pull_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let staging = pull_latest_dir(temp_dir.path());
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("README.md"), "A\nB\n").unwrap();
        fs::write(temp_dir.path().join("README.md"), "A\nB\n").unwrap();

        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let staged = vec![StagedPage {
            rel_path: "README.md".into(),
            page_id: "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234".into(),
            parent_id: None,
            title: "README".into(),
            remote_last_edited: None,
            kind: RecordKind::File,
            is_new: false,
        }];
        let before = fs::read(temp_dir.path().join("README.md")).unwrap();
        let mtime_before = mtime_ns(&temp_dir.path().join("README.md"));

        let mut report = Report::new();
        apply_merge(temp_dir.path(), &staging, &mut index, &staged, &mut report).unwrap();

        let after = fs::read(temp_dir.path().join("README.md")).unwrap();
        assert_eq!(before, after);
        assert_eq!(mtime_before, mtime_ns(&temp_dir.path().join("README.md")));
        assert_eq!(report.count(Outcome::Skipped), 1);
    }

    #[test]
    fn test_apply_merge_conflict_is_counted_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let staging = pull_latest_dir(temp_dir.path());
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("note.md"), "x\nY\nz\n").unwrap();
        fs::write(temp_dir.path().join("note.md"), "x\ny\nz\n").unwrap();

        let mut index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let staged = vec![StagedPage {
            rel_path: "note.md".into(),
            page_id: "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234".into(),
            parent_id: None,
            title: "note".into(),
            remote_last_edited: None,
            kind: RecordKind::File,
            is_new: false,
        }];
        let mut report = Report::new();
        apply_merge(temp_dir.path(), &staging, &mut index, &staged, &mut report).unwrap();

        let merged = fs::read_to_string(temp_dir.path().join("note.md")).unwrap();
        assert_eq!(
            merged,
            "x\n<<<<<<< LOCAL\ny\n=======\nY\n>>>>>>> REMOTE\nz\n"
        );
        assert_eq!(report.conflict_hunks, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_child_page_partition() {
        use crate::notion::types::{ChildPageBlock, RichTextBlock};
        let blocks = vec![
            Block {
                object: "block".into(),
                id: Some("child-1".into()),
                has_children: true,
                payload: BlockPayload::ChildPage {
                    child_page: ChildPageBlock {
                        title: "Sub".into(),
                    },
                },
            },
            Block::new(BlockPayload::Paragraph {
                paragraph: RichTextBlock::default(),
            }),
        ];
        assert_eq!(child_page_ids(&blocks).len(), 1);
        assert_eq!(content_blocks(blocks).len(), 1);
    }
}
