//! Push local changes to the remote.

use std::path::Path;

use crate::error::Result;
use crate::push::{self, PushOptions};

/// Execute `ns push`.
///
/// # Errors
///
/// Fails on command-fatal errors (auth, corrupt index); per-item
/// failures are reflected in the exit code via the report.
pub fn execute(folder: &Path, force_all: bool, dry_run: bool, verbose: bool) -> Result<u8> {
    let report = push::run(
        folder,
        PushOptions {
            force_all,
            dry_run,
            verbose,
        },
    )?;
    report.print_summary(verbose);
    Ok(report.exit_code())
}
