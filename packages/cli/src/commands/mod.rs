pub mod apply;
pub mod check;
pub mod init;
pub mod outline;
pub mod watch;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use outline::{outline, OutlineArgs};
pub use watch::{watch, WatchArgs};

use anyhow::{anyhow, Context, Result};
use sculpt_parser::{format_errors, ParseResult};
use std::path::Path;

pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Render parse errors as a report, or fail when there is no tree at all.
pub(crate) fn report_errors(path: &Path, parsed: &ParseResult) -> Result<()> {
    if !parsed.has_errors() {
        return Ok(());
    }
    let report = format_errors(&parsed.source, &path.display().to_string(), &parsed.errors);
    eprint!("{}", report);
    if parsed.root.is_none() {
        return Err(anyhow!("{} has no markup tree", path.display()));
    }
    Ok(())
}
