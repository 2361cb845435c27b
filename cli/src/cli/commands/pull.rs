//! Pull remote changes into the local tree.

use std::path::Path;

use crate::error::Result;
use crate::pull::{self, PullOptions};

/// Execute `ns pull`.
///
/// # Errors
///
/// Fails on command-fatal errors; per-item failures are reflected in
/// the exit code via the report.
#[allow(clippy::fn_params_excessive_bools)]
pub fn execute(
    folder: &Path,
    new_only: bool,
    existing_only: bool,
    force_all: bool,
    dry_run: bool,
    verbose: bool,
) -> Result<u8> {
    let report = pull::run(
        folder,
        PullOptions {
            new_only,
            existing_only,
            force_all,
            dry_run,
            verbose,
        },
    )?;
    report.print_summary(verbose);
    if report.conflict_hunks > 0 {
        println!(
            "{} conflict hunk(s) written; resolve the markers, then push.",
            report.conflict_hunks
        );
    }
    Ok(report.exit_code())
}
