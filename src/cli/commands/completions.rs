//! `foldervault completions` — generate shell completion scripts.
//!
//! Usage:
//!   foldervault completions bash > ~/.local/share/bash-completion/completions/foldervault
//!   foldervault completions zsh > ~/.zfunc/_foldervault

use std::io;

use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{FolderVaultError, Result};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    let shell = parse_shell(shell)?;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

/// Parse a shell name, case-insensitively; `ps` is short for PowerShell.
fn parse_shell(name: &str) -> Result<Shell> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("ps") {
        return Ok(Shell::PowerShell);
    }
    <Shell as ValueEnum>::from_str(name, true).map_err(|_| {
        FolderVaultError::CommandFailed(format!(
            "unknown shell '{name}' — supported: bash, zsh, fish, powershell, elvish"
        ))
    })
}
