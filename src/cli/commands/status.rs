//! `foldervault status` — lockout state of one sealed folder.

use std::path::Path;

use crate::cli::output;
use crate::cli::{build_engine, Cli};
use crate::errors::Result;
use crate::vault::engine::resolve_path;

/// Execute the `status` command.
pub fn execute(cli: &Cli, path: &Path) -> Result<()> {
    let (engine, _settings, _data_dir) = build_engine(cli)?;

    let remaining = engine.remaining_lockout_seconds(path)?;
    let resolved = resolve_path(path)?;
    let summary = engine
        .list_vaults()
        .into_iter()
        .find(|v| v.original_path == resolved);

    if let Some(v) = &summary {
        output::info(&format!(
            "{} is sealed as {} ({})",
            v.original_path.display(),
            v.container_path.display(),
            v.protection
        ));
    }

    if remaining > 0 {
        output::warning(&format!("Locked for {remaining} more second(s)."));
    } else {
        match summary {
            Some(v) => output::success(&format!(
                "Accepting passwords ({} of {} attempts used).",
                v.attempts, v.max_attempts
            )),
            None => output::success("Accepting passwords."),
        }
    }

    Ok(())
}
