//! Error types for the NoteSync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Spec-mandated exit codes (0 = success, 1 = operational, 2 = usage)
//! - A distinction between command-aborting errors and per-item errors
//!   that are collected into a report

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for NoteSync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes.
///
/// Each code maps to a SCREAMING_SNAKE string for log lines and the
/// summary table. Only two codes abort a whole command (`AUTH_MISSING`,
/// `INDEX_CORRUPT`); everything else is scoped to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AuthMissing,
    UrlMalformed,
    IndexCorrupt,
    InvariantViolation,
    RemoteFailed,
    RemoteFatal,
    MergeConflict,
    IoError,
    ConfigError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::AuthMissing => "AUTH_MISSING",
            Self::UrlMalformed => "URL_MALFORMED",
            Self::IndexCorrupt => "INDEX_CORRUPT",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
            Self::RemoteFailed => "REMOTE_FAILED",
            Self::RemoteFatal => "REMOTE_FATAL",
            Self::MergeConflict => "MERGE_CONFLICT",
            Self::IoError => "IO_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Whether this kind makes the command exit non-zero.
    ///
    /// Merge conflicts are reported (markers land in the file and the
    /// summary counts them) but do not fail the command.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::MergeConflict)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in NoteSync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no Notion token found (set NOTION_TOKEN or NOTION_API_KEY)")]
    AuthMissing,

    #[error("no page id found in '{input}'")]
    UrlMalformed { input: String },

    #[error("index at {path} is corrupt: {message}")]
    IndexCorrupt { path: PathBuf, message: String },

    #[error("index invariant violated: {0}")]
    InvariantViolation(String),

    #[error("remote request failed after retries: {0}")]
    RemoteFailed(String),

    #[error("remote rejected request ({status}): {message}")]
    RemoteFatal { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::AuthMissing => ErrorCode::AuthMissing,
            Self::UrlMalformed { .. } => ErrorCode::UrlMalformed,
            Self::IndexCorrupt { .. } => ErrorCode::IndexCorrupt,
            Self::InvariantViolation(_) => ErrorCode::InvariantViolation,
            Self::RemoteFailed(_) => ErrorCode::RemoteFailed,
            Self::RemoteFatal { .. } => ErrorCode::RemoteFatal,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Yaml(_) | Self::Config(_) | Self::Other(_) => {
                ErrorCode::ConfigError
            }
        }
    }

    /// Exit code for a command that terminated with this error.
    ///
    /// Operational failures are always 1; usage errors never reach here
    /// (clap exits 2 on its own).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }

    /// Whether this error aborts the whole command.
    ///
    /// Everything else is collected per item and reported at the end.
    #[must_use]
    pub const fn is_command_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthMissing | Self::IndexCorrupt { .. } | Self::Config(_)
        )
    }

    /// Context-aware recovery hint, if an actionable one exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::AuthMissing => {
                Some("Set NOTION_TOKEN in the environment or in <project>/.c2n/.env".to_string())
            }
            Self::IndexCorrupt { .. } | Self::InvariantViolation(_) => {
                Some("Run `ns status <folder> --fix` to repair the index".to_string())
            }
            Self::UrlMalformed { .. } => {
                Some("Expected a Notion URL containing a 32-hex or dashed page id".to_string())
            }
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let code = status.as_u16();
            if matches!(code, 401 | 403 | 404) {
                return Self::RemoteFatal {
                    status: code,
                    message: err.to_string(),
                };
            }
        }
        Self::RemoteFailed(err.to_string())
    }
}
