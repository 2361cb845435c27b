//! Initialize a project folder for syncing.
//!
//! Creates the hidden metadata skeleton:
//!
//! ```text
//! <folder>/.c2n/config.json   root URL, sync mode, defaults
//! <folder>/.c2n/index.yaml    empty index
//! <folder>/.c2n_ignore        default ignore patterns
//! ```
//!
//! The root URL comes from `--root-url`, falling back to the
//! `NOTION_ROOT_URL` environment variable (init is the only command that
//! reads it).

use std::fs;
use std::path::Path;

use crate::config::{self, ProjectConfig, SyncMode, IGNORE_FILE};
use crate::error::{Error, Result};
use crate::index::{Index, IndexRecord, RecordKind};
use crate::notion::NotionClient;
use crate::resolver;

/// Execute `ns init`.
///
/// # Errors
///
/// Fails when the folder is already initialized or no root URL can be
/// resolved.
pub fn execute(
    folder: Option<&Path>,
    workspace_url: Option<&str>,
    root_url: Option<&str>,
) -> Result<u8> {
    let folder = folder.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(folder)?;
    config::load_env_for_project(folder);

    if config::config_path(folder).exists() {
        return Err(Error::Config(format!(
            "already initialized: {}",
            config::config_path(folder).display()
        )));
    }

    let root_url = resolver::resolve_init_root_url(root_url)?;
    let root_id = resolver::extract_page_id(&root_url)?;

    initialize_project(folder, &root_url, &root_id, workspace_url, SyncMode::Hierarchy)?;

    println!("Initialized project in {}", folder.display());
    println!("  Root page: {root_url}");
    println!("  Metadata:  {}", config::meta_dir(folder).display());
    Ok(0)
}

/// Shared skeleton creation for `init` and `clone`.
pub(crate) fn initialize_project(
    folder: &Path,
    root_url: &str,
    root_id: &str,
    workspace_url: Option<&str>,
    sync_mode: SyncMode,
) -> Result<()> {
    let cfg = ProjectConfig {
        default_parent_url: Some(root_url.to_string()),
        workspace_url: workspace_url.map(String::from),
        sync_mode,
        ..ProjectConfig::default()
    };
    cfg.save(folder)?;

    let mut index = Index::load(folder, sync_mode)?;
    index.set_root_page_url(root_url);
    let mut root = IndexRecord::new(
        match sync_mode {
            SyncMode::Hierarchy => RecordKind::Directory,
            SyncMode::Flat => RecordKind::Page,
        },
        root_id.to_string(),
        NotionClient::page_url(root_id),
    );
    root.title = None;
    index.put("", root)?;
    index.save()?;

    let ignore_path = folder.join(IGNORE_FILE);
    if !ignore_path.exists() {
        fs::write(&ignore_path, config::default_ignore_template())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROOT_URL: &str = "https://www.notion.so/ws/Home-27db1a4f8d1c4ce59f2a11aa6bb41234";

    #[test]
    fn test_init_creates_skeleton() {
        let temp_dir = TempDir::new().unwrap();
        let code = execute(Some(temp_dir.path()), None, Some(ROOT_URL)).unwrap();
        assert_eq!(code, 0);

        assert!(config::config_path(temp_dir.path()).exists());
        assert!(config::index_path(temp_dir.path()).exists());
        assert!(temp_dir.path().join(IGNORE_FILE).exists());

        let cfg = ProjectConfig::load(temp_dir.path()).unwrap();
        assert_eq!(cfg.default_parent_url.as_deref(), Some(ROOT_URL));
        assert_eq!(cfg.sync_mode, SyncMode::Hierarchy);

        let index = Index::load(temp_dir.path(), SyncMode::Hierarchy).unwrap();
        let root = index.get("").unwrap();
        assert_eq!(root.page_id, "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234");
        assert_eq!(root.kind, RecordKind::Directory);
    }

    #[test]
    fn test_init_refuses_reinitialization() {
        let temp_dir = TempDir::new().unwrap();
        execute(Some(temp_dir.path()), None, Some(ROOT_URL)).unwrap();
        let result = execute(Some(temp_dir.path()), None, Some(ROOT_URL));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_init_rejects_malformed_url() {
        let temp_dir = TempDir::new().unwrap();
        let result = execute(Some(temp_dir.path()), None, Some("https://example.com/none"));
        assert!(matches!(result, Err(Error::UrlMalformed { .. })));
    }

    #[test]
    fn test_init_keeps_existing_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(IGNORE_FILE), "custom/\n").unwrap();
        execute(Some(temp_dir.path()), None, Some(ROOT_URL)).unwrap();

        let content = fs::read_to_string(temp_dir.path().join(IGNORE_FILE)).unwrap();
        assert_eq!(content, "custom/\n");
    }
}
