//! Projection of the remote page tree onto the local filesystem.
//!
//! Two layouts exist:
//!
//! - **Hierarchy mode**: directory pages (folder icon, or child pages and
//!   no content of their own) become local directories; other pages
//!   become `<title>.md` under their parent.
//! - **Flat mode**: every page becomes `<title>.md` directly under the
//!   project root, with the hierarchy encoded in YAML front-matter.
//!
//! Switching modes requires `pull --force-all` and never deletes files
//! produced by the previous layout.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::resolver::compact_id;

/// Characters never allowed in projected file names.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize a page title for filesystem use.
///
/// Strips path separators, reserved characters, and control characters,
/// then collapses whitespace runs. Falls back to `Untitled` when nothing
/// survives.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "Untitled".to_string()
    } else {
        collapsed
    }
}

/// Relative path for a page in Hierarchy mode.
///
/// `parent_rel` is the parent directory's relative path (empty for the
/// project root).
#[must_use]
pub fn hierarchy_rel_path(parent_rel: &str, title: &str, is_directory: bool) -> String {
    let name = sanitize_title(title);
    let name = if is_directory {
        name
    } else {
        format!("{name}.md")
    };
    if parent_rel.is_empty() {
        name
    } else {
        format!("{parent_rel}/{name}")
    }
}

/// File name for a page in Flat mode, disambiguating duplicate titles
/// with an 8-char id suffix.
#[must_use]
pub fn flat_filename(title: &str, page_id: &str, taken: &HashSet<String>) -> String {
    let base = sanitize_title(title);
    let plain = format!("{base}.md");
    if !taken.contains(&plain) {
        return plain;
    }
    let id8: String = compact_id(page_id).chars().take(8).collect();
    format!("{base}_{id8}.md")
}

// ── Front-matter ──────────────────────────────────────────────

/// Flat-mode front-matter payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFrontmatter {
    pub page_id: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_ids: Vec<String>,
    #[serde(default)]
    pub sync_mode: String,
}

impl FlatFrontmatter {
    /// Render the front-matter block with fixed key order.
    ///
    /// The key order is part of the on-disk contract: `page_id`,
    /// `page_url`, `parent_id`, `parent_type`, `children_ids`,
    /// `sync_mode`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        let _ = writeln!(out, "page_id: {}", self.page_id);
        let _ = writeln!(out, "page_url: {}", self.page_url);
        if let Some(parent_id) = &self.parent_id {
            let _ = writeln!(out, "parent_id: {parent_id}");
            let _ = writeln!(
                out,
                "parent_type: {}",
                self.parent_type.as_deref().unwrap_or("page")
            );
        }
        if !self.children_ids.is_empty() {
            out.push_str("children_ids:\n");
            for child in &self.children_ids {
                let _ = writeln!(out, "  - {child}");
            }
        }
        let _ = writeln!(out, "sync_mode: flat");
        out.push_str("---\n\n");
        out
    }
}

/// Split a document into its front-matter YAML (if any) and body.
///
/// The body starts right after the closing `---` line; a missing or
/// unterminated fence yields `(None, content)`.
#[must_use]
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, content);
    };
    // Closing fence: a line that is exactly "---"
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches('\n') == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, content)
}

/// Parse the flat-mode front-matter of a document, if present and valid.
#[must_use]
pub fn parse_flat_frontmatter(content: &str) -> Option<FlatFrontmatter> {
    let (yaml, _) = split_frontmatter(content);
    serde_yaml::from_str(yaml?).ok()
}
