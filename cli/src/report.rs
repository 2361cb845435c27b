//! Per-item outcome collection and the end-of-command summary.
//!
//! Engines never abort the walk on a single item: each item resolves to
//! an outcome (created, updated, skipped, merged, conflicted, failed)
//! that lands here. At command end the report prints a summary table and
//! decides the exit code — non-zero iff any fatal kind occurred.

use colored::Colorize;

use crate::error::{Error, ErrorCode};

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
    Merged,
    Conflicted,
    Planned,
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Merged => "merged",
            Self::Conflicted => "conflict",
            Self::Planned => "planned",
            Self::Failed => "failed",
        }
    }
}

/// One row of the summary table.
#[derive(Debug)]
pub struct ItemResult {
    pub rel_path: String,
    pub outcome: Outcome,
    pub url: Option<String>,
    pub reason: Option<String>,
    pub error_code: Option<ErrorCode>,
}

/// Collected outcomes for one command run.
#[derive(Debug, Default)]
pub struct Report {
    items: Vec<ItemResult>,
    /// Total conflict hunks across merged files.
    pub conflict_hunks: usize,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful outcome.
    pub fn record(&mut self, rel_path: impl Into<String>, outcome: Outcome, url: Option<String>) {
        self.items.push(ItemResult {
            rel_path: rel_path.into(),
            outcome,
            url,
            reason: None,
            error_code: None,
        });
    }

    /// Record a per-item failure.
    pub fn record_error(&mut self, rel_path: impl Into<String>, error: &Error) {
        let code = error.error_code();
        self.items.push(ItemResult {
            rel_path: rel_path.into(),
            outcome: Outcome::Failed,
            url: None,
            reason: Some(error.to_string()),
            error_code: Some(code),
        });
    }

    /// Record a merge conflict (non-fatal).
    pub fn record_conflict(&mut self, rel_path: impl Into<String>, hunks: usize) {
        self.conflict_hunks += hunks;
        self.items.push(ItemResult {
            rel_path: rel_path.into(),
            outcome: Outcome::Conflicted,
            url: None,
            reason: Some(format!("{hunks} conflict hunk(s)")),
            error_code: Some(ErrorCode::MergeConflict),
        });
    }

    #[must_use]
    pub fn items(&self) -> &[ItemResult] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count of items with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }

    /// Whether any fatal error kind occurred.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.error_code.is_some_and(|c| c.is_fatal()))
    }

    /// Exit code for the whole command: 1 iff any fatal kind occurred.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.has_fatal())
    }

    /// Print the per-item table and the totals line.
    pub fn print_summary(&self, verbose: bool) {
        for item in &self.items {
            let show = verbose
                || !matches!(item.outcome, Outcome::Skipped)
                || item.error_code.is_some();
            if !show {
                continue;
            }
            let status = match item.outcome {
                Outcome::Failed => item.outcome.as_str().red().bold(),
                Outcome::Conflicted => item.outcome.as_str().yellow().bold(),
                Outcome::Skipped | Outcome::Planned => item.outcome.as_str().dimmed(),
                _ => item.outcome.as_str().green(),
            };
            let url = item.url.as_deref().unwrap_or("-");
            match &item.reason {
                Some(reason) => println!("{status:>10}  {}  {url}  ({reason})", item.rel_path),
                None => println!("{status:>10}  {}  {url}", item.rel_path),
            }
        }

        let failed = self.count(Outcome::Failed);
        let summary = format!(
            "{} created, {} updated, {} skipped, {} merged, {} conflict(s), {} failed",
            self.count(Outcome::Created),
            self.count(Outcome::Updated),
            self.count(Outcome::Skipped),
            self.count(Outcome::Merged),
            self.count(Outcome::Conflicted),
            failed,
        );
        if failed > 0 {
            println!("{}", summary.red());
        } else {
            println!("{summary}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_zero_without_failures() {
        let mut report = Report::new();
        report.record("a.md", Outcome::Created, None);
        report.record("b.md", Outcome::Skipped, None);
        assert!(!report.has_fatal());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_one_with_fatal_error() {
        let mut report = Report::new();
        report.record("a.md", Outcome::Created, None);
        report.record_error("b.md", &Error::RemoteFailed("boom".into()));
        assert!(report.has_fatal());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_merge_conflicts_do_not_fail_the_command() {
        let mut report = Report::new();
        report.record_conflict("a.md", 2);
        assert_eq!(report.conflict_hunks, 2);
        assert!(!report.has_fatal());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.count(Outcome::Conflicted), 1);
    }

    #[test]
    fn test_counts() {
        let mut report = Report::new();
        report.record("a.md", Outcome::Created, None);
        report.record("b.md", Outcome::Created, None);
        report.record("c.md", Outcome::Updated, None);
        assert_eq!(report.count(Outcome::Created), 2);
        assert_eq!(report.count(Outcome::Updated), 1);
        assert_eq!(report.count(Outcome::Failed), 0);
    }
}
