//! Page-id extraction and root-URL resolution.
//!
//! This module is the single source of truth for the project root URL,
//! replacing the historical spread across `root_page_url` (index) and
//! per-item `parent_url` keys. Resolution order:
//!
//! 1. `config.default_parent_url`
//! 2. Environment variable `NOTION_ROOT_URL` (only honored during `init`)
//!
//! Legacy keys are *read but never written*; `status --fix` rewrites them
//! into `default_parent_url`.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::index::Index;

static ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn id_regex() -> &'static Regex {
    ID_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)([0-9a-f]{32}|[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
        )
        .unwrap()
    })
}

/// Extract a page id from a URL or bare id string.
///
/// Accepts either the 32-hex compact form or the dashed form, anywhere in
/// the input; the first match wins and is canonicalized to dashed
/// lowercase.
///
/// # Errors
///
/// Returns [`Error::UrlMalformed`] when no id is present.
pub fn extract_page_id(input: &str) -> Result<String> {
    id_regex()
        .find(input)
        .map(|m| dashed_id(m.as_str()))
        .ok_or_else(|| Error::UrlMalformed {
            input: input.to_string(),
        })
}

/// Canonical dashed lowercase form of an id (either input form accepted).
#[must_use]
pub fn dashed_id(id: &str) -> String {
    let compact: String = id
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_lowercase();
    if compact.len() != 32 {
        return compact;
    }
    format!(
        "{}-{}-{}-{}-{}",
        &compact[0..8],
        &compact[8..12],
        &compact[12..16],
        &compact[16..20],
        &compact[20..32]
    )
}

/// Compact 32-hex form of an id (either input form accepted).
#[must_use]
pub fn compact_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// Canonical URL for a page id.
#[must_use]
pub fn page_url_for_id(id: &str) -> String {
    format!("https://www.notion.so/{}", compact_id(id))
}

/// Resolve the project root URL from config, falling back to legacy
/// index keys.
///
/// `default_parent_url` in the config is authoritative. When absent, the
/// legacy top-level `root_page_url` in the index and the legacy
/// `parent_url` on the root record are consulted (read-only).
///
/// # Errors
///
/// Returns [`Error::Config`] when no source yields a URL.
pub fn resolve_root_url(config: &ProjectConfig, index: &Index) -> Result<String> {
    if let Some(url) = config.default_parent_url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    if let Some(url) = index.root_page_url().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    if let Some(url) = index
        .get("")
        .and_then(|r| r.extra_str("parent_url"))
        .filter(|u| !u.is_empty())
    {
        return Ok(url.to_string());
    }
    Err(Error::Config(
        "no root URL configured; run `ns init --root-url <URL>` or `ns clone <URL>`".to_string(),
    ))
}

/// Root URL for `init`: the explicit flag wins, then `NOTION_ROOT_URL`.
///
/// # Errors
///
/// Returns [`Error::Config`] when neither is set.
pub fn resolve_init_root_url(flag: Option<&str>) -> Result<String> {
    if let Some(url) = flag.filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    if let Ok(url) = std::env::var("NOTION_ROOT_URL") {
        if !url.is_empty() {
            return Ok(url);
        }
    }
    Err(Error::Config(
        "no root URL given; pass --root-url or set NOTION_ROOT_URL".to_string(),
    ))
}
