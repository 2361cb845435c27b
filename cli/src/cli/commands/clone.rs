//! Clone a remote subtree into a fresh project.
//!
//! `clone` is `init` followed by a full pull: the skeleton is created
//! with the given URL as root, then the new-page pull populates the
//! index and the working tree from the remote.

use std::fs;
use std::path::Path;

use crate::config::{self, SyncMode};
use crate::error::{Error, Result};
use crate::pull::{self, PullOptions};
use crate::resolver;

use super::init::initialize_project;

/// Execute `ns clone`.
///
/// # Errors
///
/// Fails when no URL is available, the folder is already initialized,
/// or the initial pull aborts.
pub fn execute(
    url: Option<&str>,
    folder: Option<&Path>,
    workspace_url: Option<&str>,
    verbose: bool,
) -> Result<u8> {
    let folder = folder.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(folder)?;
    config::load_env_for_project(folder);

    let root_url = match url {
        Some(url) => url.to_string(),
        None => resolver::resolve_init_root_url(None)?,
    };
    let root_id = resolver::extract_page_id(&root_url)?;

    if config::config_path(folder).exists() {
        return Err(Error::Config(format!(
            "already initialized: {}",
            config::config_path(folder).display()
        )));
    }

    initialize_project(folder, &root_url, &root_id, workspace_url, SyncMode::Hierarchy)?;
    println!("Cloning {root_url} into {}", folder.display());

    let report = pull::run(
        folder,
        PullOptions {
            verbose,
            ..PullOptions::default()
        },
    )?;
    report.print_summary(verbose);
    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clone_requires_url() {
        let temp_dir = TempDir::new().unwrap();
        std::env::remove_var("NOTION_ROOT_URL");
        let result = execute(None, Some(temp_dir.path()), None, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_clone_rejects_malformed_url() {
        let temp_dir = TempDir::new().unwrap();
        let result = execute(
            Some("https://example.com/no-id"),
            Some(temp_dir.path()),
            None,
            false,
        );
        assert!(matches!(result, Err(Error::UrlMalformed { .. })));
    }
}
