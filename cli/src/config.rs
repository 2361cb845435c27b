//! Project configuration and environment loading.
//!
//! A NoteSync project is a directory containing a hidden `.c2n/` metadata
//! folder:
//!
//! ```text
//! .c2n/config.json       project configuration
//! .c2n/index.yaml        path -> remote page index
//! .c2n/cache.json        filesystem + remote-tree cache
//! .c2n/pull/latest/      staging area for pulled content
//! .c2n_ignore            gitignore-syntax exclusion patterns
//! ```
//!
//! Environment overrides are loaded from `<project>/.c2n/.env`, then
//! `<project>/.env`, then a `.env` next to the binary; the first
//! definition of a variable wins. `NOTION_TOKEN` and `NOTION_API_KEY`
//! are bridged so either name works.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the hidden metadata folder.
pub const META_DIR: &str = ".c2n";

/// Name of the ignore file at the project root.
pub const IGNORE_FILE: &str = ".c2n_ignore";

/// Layout mode for projecting the remote tree onto the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Directory pages become directories; leaf pages become `<title>.md`.
    #[default]
    Hierarchy,
    /// Every page becomes `<title>.md` at the project root, hierarchy in
    /// front-matter.
    Flat,
}

/// Per-project configuration stored at `.c2n/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Canonical root page URL. Primary source of truth for the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_parent_url: Option<String>,

    /// Workspace URL (parent of the project page), recorded by init/clone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_url: Option<String>,

    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Whether `pull` applies the merge to the working tree by default.
    #[serde(default = "default_true")]
    pub pull_apply_default: bool,

    /// Whether `push` skips unchanged files by default.
    #[serde(default = "default_true")]
    pub push_changed_only_default: bool,

    /// Whether directory pages are left untouched once created.
    #[serde(default)]
    pub no_dir_update_default: bool,

    /// Maximum parallel remote requests.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_true() -> bool {
    true
}

fn default_parallelism() -> usize {
    8
}

impl ProjectConfig {
    /// Load the config for a project directory, returning defaults when
    /// the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be parsed.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = config_path(project_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Persist the config to `.c2n/config.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata directory or file cannot be
    /// written.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let dir = meta_dir(project_dir);
        fs::create_dir_all(&dir)?;
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(config_path(project_dir), text)?;
        Ok(())
    }
}

/// `.c2n/` for a project directory.
#[must_use]
pub fn meta_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(META_DIR)
}

/// `.c2n/config.json` for a project directory.
#[must_use]
pub fn config_path(project_dir: &Path) -> PathBuf {
    meta_dir(project_dir).join("config.json")
}

/// `.c2n/index.yaml` for a project directory.
#[must_use]
pub fn index_path(project_dir: &Path) -> PathBuf {
    meta_dir(project_dir).join("index.yaml")
}

/// `.c2n/cache.json` for a project directory.
#[must_use]
pub fn cache_path(project_dir: &Path) -> PathBuf {
    meta_dir(project_dir).join("cache.json")
}

/// `.c2n/pull/latest/` staging area for a project directory.
#[must_use]
pub fn pull_latest_dir(project_dir: &Path) -> PathBuf {
    meta_dir(project_dir).join("pull").join("latest")
}

// ── Environment ───────────────────────────────────────────────

/// Load `.env` files for a project and bridge the token variables.
///
/// Values already present in the environment always win; within the file
/// chain, the first definition wins.
pub fn load_env_for_project(project_dir: &Path) {
    load_env_file(&meta_dir(project_dir).join(".env"));
    load_env_file(&project_dir.join(".env"));
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            load_env_file(&dir.join(".env"));
        }
    }
    bridge_token_vars();
}

fn load_env_file(path: &Path) {
    let Ok(text) = fs::read_to_string(path) else {
        return;
    };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
}

/// Mirror `NOTION_TOKEN` and `NOTION_API_KEY` into each other so callers
/// can rely on either name.
pub fn bridge_token_vars() {
    let token = std::env::var("NOTION_TOKEN").ok();
    let api_key = std::env::var("NOTION_API_KEY").ok();
    match (token, api_key) {
        (None, Some(key)) => std::env::set_var("NOTION_TOKEN", key),
        (Some(token), None) => std::env::set_var("NOTION_API_KEY", token),
        _ => {}
    }
}

/// The auth token, from either variable.
///
/// # Errors
///
/// Returns [`Error::AuthMissing`] when neither variable is set.
pub fn notion_token() -> Result<String> {
    std::env::var("NOTION_TOKEN")
        .or_else(|_| std::env::var("NOTION_API_KEY"))
        .map_err(|_| Error::AuthMissing)
}

/// Default `.c2n_ignore` contents written by `init`.
#[must_use]
pub fn default_ignore_template() -> &'static str {
    r"# NoteSync ignore patterns (gitignore-style)

# Build artifacts
build/
dist/
target/

# Temporary files
*.tmp
*.log
.DS_Store

# IDE files
.vscode/
.idea/

# Personal notes
_private/

# Dependency folders
node_modules/

# Image files (not pushed as pages)
*.png
*.jpg
*.jpeg
*.gif
*.bmp
*.webp
*.svg
*.ico
"
}
