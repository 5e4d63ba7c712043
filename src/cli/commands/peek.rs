//! `foldervault peek` — decrypt a copy of a sealed folder.
//!
//! The container and its record stay in place; the copy is plaintext and
//! is the caller's to delete.

use std::path::Path;

use super::audit_rejection;
use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{build_engine, prompt_password, Cli};
use crate::errors::Result;

/// Execute the `peek` command.
pub fn execute(cli: &Cli, path: &Path, to: &Path) -> Result<()> {
    let (engine, _settings, data_dir) = build_engine(cli)?;

    let password = prompt_password("Enter folder password")?;
    let entries = match engine.peek_vault(path, &password, to) {
        Ok(n) => n,
        Err(e) => {
            audit_rejection(&data_dir, path, &e);
            return Err(e);
        }
    };

    log_audit(
        &data_dir,
        "peek",
        Some(path),
        Some(&format!("copied to {}", to.display())),
    );
    output::success(&format!("Extracted {entries} entries into {}", to.display()));
    output::warning("The copy is not protected. Delete it when you are done.");

    Ok(())
}
