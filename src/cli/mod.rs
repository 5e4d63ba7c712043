//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use zeroize::Zeroizing;

use crate::config::{KeyBackend, Settings};
use crate::errors::{FolderVaultError, Result};
use crate::keystore::{KeySealer, MasterKeyStore, PassphraseSealer};
use crate::vault::VaultEngine;

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding a vault password for scripted use.
pub const PASSWORD_ENV: &str = "FOLDERVAULT_PASSWORD";

/// Environment variable holding the key passphrase (passphrase backend).
pub const KEY_PASSPHRASE_ENV: &str = "FOLDERVAULT_KEY_PASSPHRASE";

/// FolderVault CLI: seal folders behind a password.
#[derive(Parser)]
#[command(
    name = "foldervault",
    about = "Seal folders into encrypted containers behind a password",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (default: $FOLDERVAULT_HOME or the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Seal a folder behind a password
    Lock {
        /// Folder to seal
        path: PathBuf,

        /// Name of the sealed artifact (default: a random name)
        #[arg(long)]
        cover: Option<String>,

        /// Wrong passwords allowed before a lockout
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Lockout length in seconds
        #[arg(long)]
        wait: Option<u64>,

        /// Rename and restrict the folder instead of encrypting it
        #[arg(long)]
        conceal: bool,

        /// With --conceal, also hide the renamed folder from browsing
        #[arg(long, requires = "conceal")]
        hidden: bool,
    },

    /// Restore a sealed folder
    Unlock {
        /// Original path of the sealed folder
        path: PathBuf,
    },

    /// Change a sealed folder's password
    Passwd {
        /// Original path of the sealed folder
        path: PathBuf,
    },

    /// Decrypt a copy of a sealed folder, leaving it sealed
    Peek {
        /// Original path of the sealed folder
        path: PathBuf,

        /// New folder to extract into
        #[arg(long)]
        to: PathBuf,
    },

    /// List sealed folders
    List,

    /// Show the lockout state of a sealed folder
    Status {
        /// Original path of the sealed folder
        path: PathBuf,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the data directory from the CLI arguments and environment.
pub fn data_dir(cli: &Cli) -> Result<PathBuf> {
    Settings::data_dir(cli.data_dir.as_deref())
}

/// Load settings and build an engine over the data directory.
///
/// Returns the data directory too, for audit logging.
pub fn build_engine(cli: &Cli) -> Result<(VaultEngine, Settings, PathBuf)> {
    let dir = data_dir(cli)?;
    let settings = Settings::load(&dir)?;
    let sealer = build_sealer(&dir, &settings)?;
    let engine = VaultEngine::new(&dir, sealer, &settings);
    Ok((engine, settings, dir))
}

/// Pick the key sealer named by `key_backend`.
fn build_sealer(dir: &Path, settings: &Settings) -> Result<Box<dyn KeySealer>> {
    let key_path = dir.join(MasterKeyStore::FILE_NAME);

    match settings.key_backend {
        #[cfg(feature = "keyring-store")]
        KeyBackend::Keyring => Ok(Box::new(crate::keystore::KeyringSealer::new(&key_path))),

        #[cfg(not(feature = "keyring-store"))]
        KeyBackend::Keyring => Err(FolderVaultError::ConfigError(
            "key_backend = \"keyring\" needs a build with the keyring-store feature".into(),
        )),

        KeyBackend::Passphrase => {
            let passphrase = prompt_key_passphrase(!key_path.exists())?;
            Ok(Box::new(PassphraseSealer::new(
                &passphrase,
                settings.argon2_params(),
            )?))
        }
    }
}

/// Get the key passphrase from `FOLDERVAULT_KEY_PASSPHRASE` or a prompt.
///
/// `first_use` asks for confirmation, since the passphrase is about to
/// seal a brand-new master key.
fn prompt_key_passphrase(first_use: bool) -> Result<Zeroizing<String>> {
    if let Some(pw) = non_empty_env(KEY_PASSPHRASE_ENV) {
        return Ok(pw);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Enter key passphrase");
    if first_use {
        prompt = prompt.with_confirmation(
            "Confirm key passphrase",
            "Passphrases do not match, try again",
        );
    }
    let pw = prompt
        .interact()
        .map_err(|e| FolderVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Get a vault password, trying in order:
/// 1. `FOLDERVAULT_PASSWORD` env var (scripting/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = non_empty_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| FolderVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.
///
/// `env_var` supplies the password non-interactively when set.
/// Enforces a minimum password length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = non_empty_env(env_var) {
        check_password_strength(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose folder password")
            .with_confirmation(
                "Confirm folder password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| FolderVaultError::CommandFailed(format!("password prompt: {e}")))?;

        if check_password_strength(&password).is_err() {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Reject passwords shorter than `MIN_PASSWORD_LEN` characters.
pub fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FolderVaultError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_empty_env(name: &str) -> Option<Zeroizing<String>> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password_strength("hunter2").is_err());
        assert!(check_password_strength("hunter22").is_ok());
    }

    #[test]
    fn password_length_counts_characters() {
        // Eight characters, more than eight bytes.
        assert!(check_password_strength("ääääääää").is_ok());
    }

    #[test]
    fn hidden_requires_conceal() {
        let parsed = Cli::try_parse_from(["foldervault", "lock", "/tmp/x", "--hidden"]);
        assert!(parsed.is_err());

        let parsed =
            Cli::try_parse_from(["foldervault", "lock", "/tmp/x", "--conceal", "--hidden"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["foldervault", "list", "--data-dir", "/srv/fv", "-vv"])
            .unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/srv/fv")));
        assert_eq!(cli.verbose, 2);
    }
}
