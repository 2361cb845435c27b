//! Line-granularity two-way merge with Git-style conflict markers.
//!
//! Pull renders remote pages into a staging area and merges them onto the
//! working tree through this module. The merge itself is pure — a function
//! from (local bytes, remote bytes) to (merged bytes, conflict count) —
//! so the properties are testable without any filesystem or network.
//!
//! Opcode semantics follow the classic sequence matcher: aligned ranges
//! tagged `equal | insert | delete | replace`. Remote-only insertions are
//! adopted silently; local-only and replaced ranges become conflict hunks.

use similar::{DiffOp, TextDiff};

/// Marker opening the local side of a conflict hunk.
pub const MARKER_LOCAL: &str = "<<<<<<< LOCAL";
/// Marker separating local from remote lines.
pub const MARKER_SEP: &str = "=======";
/// Marker closing the remote side of a conflict hunk.
pub const MARKER_REMOTE: &str = ">>>>>>> REMOTE";

/// How a staged file relates to its working-tree counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Bytes equal after trailing-newline normalization; nothing written.
    Same,
    /// No local file; remote written verbatim.
    Add,
    /// Local file empty; remote written verbatim.
    Replace,
    /// Both present and different; two-way merge applied.
    Update,
}

impl MergeStatus {
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Same => "SAME",
            Self::Add => "ADD",
            Self::Replace => "REPLACE",
            Self::Update => "UPDATE",
        }
    }
}

/// Outcome of merging one file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub status: MergeStatus,
    /// Content to write; `None` when the file needs no write.
    pub content: Option<String>,
    /// Number of conflict hunks emitted.
    pub conflicts: usize,
}

/// Classify and merge a (local, remote) pair.
///
/// `local` is `None` when no working-tree file exists. The remote side
/// always exists (it was just rendered from the remote page).
#[must_use]
pub fn merge_pair(local: Option<&str>, remote: &str) -> MergeOutcome {
    let Some(local) = local else {
        return MergeOutcome {
            status: MergeStatus::Add,
            content: Some(remote.to_string()),
            conflicts: 0,
        };
    };

    if local.is_empty() && !remote.is_empty() {
        return MergeOutcome {
            status: MergeStatus::Replace,
            content: Some(remote.to_string()),
            conflicts: 0,
        };
    }

    if normalize_trailing(local) == normalize_trailing(remote) {
        return MergeOutcome {
            status: MergeStatus::Same,
            content: None,
            conflicts: 0,
        };
    }

    let (merged, conflicts) = merge_two_way(local, remote);
    MergeOutcome {
        status: MergeStatus::Update,
        content: Some(merged),
        conflicts,
    }
}

/// Merge two texts line by line, marking conflicts.
///
/// Returns the merged text and the number of conflict hunks. The merged
/// text ends with a single `\n` iff either input ends with `\n`.
#[must_use]
pub fn merge_two_way(local: &str, remote: &str) -> (String, usize) {
    let local_lines: Vec<&str> = split_lines(local);
    let remote_lines: Vec<&str> = split_lines(remote);

    let diff = TextDiff::from_slices(&local_lines, &remote_lines);
    let mut out: Vec<&str> = Vec::new();
    let mut conflicts = 0usize;

    for op in diff.ops() {
        match *op {
            DiffOp::Equal { old_index, len, .. } => {
                out.extend(&local_lines[old_index..old_index + len]);
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                // Remote-only additions are adopted silently
                out.extend(&remote_lines[new_index..new_index + new_len]);
            }
            DiffOp::Delete { old_index, old_len, .. } => {
                conflicts += 1;
                out.push(MARKER_LOCAL);
                out.extend(&local_lines[old_index..old_index + old_len]);
                out.push(MARKER_SEP);
                out.push(MARKER_REMOTE);
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                conflicts += 1;
                out.push(MARKER_LOCAL);
                out.extend(&local_lines[old_index..old_index + old_len]);
                out.push(MARKER_SEP);
                out.extend(&remote_lines[new_index..new_index + new_len]);
                out.push(MARKER_REMOTE);
            }
        }
    }

    let mut merged = out.join("\n");
    if (local.ends_with('\n') || remote.ends_with('\n')) && !merged.is_empty() {
        merged.push('\n');
    }
    (merged, conflicts)
}

/// Count conflict-marker lines in a text (whole-line matches only).
#[must_use]
pub fn count_conflict_markers(text: &str) -> usize {
    text.lines()
        .filter(|l| *l == MARKER_LOCAL || *l == MARKER_SEP || *l == MARKER_REMOTE)
        .count()
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split_terminator('\n').collect()
    }
}

fn normalize_trailing(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}
