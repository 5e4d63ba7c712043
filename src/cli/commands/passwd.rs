//! `foldervault passwd` — change a sealed folder's password.
//!
//! Only the password record changes; the sealed content is encrypted with
//! the installation's master key and is not rewritten.
//!
//! For scripts, the current password comes from `FOLDERVAULT_PASSWORD`
//! and the new one from `FOLDERVAULT_NEW_PASSWORD`.

use std::path::Path;

use super::audit_rejection;
use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{build_engine, prompt_new_password, prompt_password, Cli};
use crate::errors::Result;

/// Environment variable holding the new password for scripted use.
pub const NEW_PASSWORD_ENV: &str = "FOLDERVAULT_NEW_PASSWORD";

/// Execute the `passwd` command.
pub fn execute(cli: &Cli, path: &Path) -> Result<()> {
    let (engine, _settings, data_dir) = build_engine(cli)?;

    let current = prompt_password("Enter current folder password")?;
    output::info("Choose the new folder password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;

    if let Err(e) = engine.rekey_vault(path, &current, &new_password) {
        audit_rejection(&data_dir, path, &e);
        return Err(e);
    }

    log_audit(&data_dir, "passwd", Some(path), None);
    output::success(&format!("Password changed for {}", path.display()));

    Ok(())
}
