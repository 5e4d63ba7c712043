//! `foldervault unlock` — restore a sealed folder.

use std::path::Path;

use super::audit_rejection;
use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{build_engine, prompt_password, Cli};
use crate::errors::Result;

/// Execute the `unlock` command.
pub fn execute(cli: &Cli, path: &Path) -> Result<()> {
    let (engine, _settings, data_dir) = build_engine(cli)?;

    let password = prompt_password("Enter folder password")?;
    let restored = match engine.open_vault(path, &password) {
        Ok(restored) => restored,
        Err(e) => {
            audit_rejection(&data_dir, path, &e);
            return Err(e);
        }
    };

    log_audit(&data_dir, "unlock", Some(&restored), None);
    output::success(&format!("Restored {}", restored.display()));

    Ok(())
}
