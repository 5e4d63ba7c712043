//! `foldervault lock` — seal a folder behind a password.
//!
//! Usage:
//!   foldervault lock ~/Documents/taxes
//!   foldervault lock ~/Documents/taxes --cover recipes --max-attempts 5 --wait 300
//!   foldervault lock ~/Documents/taxes --conceal --hidden

use std::path::Path;

use rand::RngCore;

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{build_engine, prompt_new_password, Cli, PASSWORD_ENV};
use crate::errors::Result;
use crate::lockout::LockoutPolicy;
use crate::vault::Protection;

/// Options for `lock` beyond the folder path.
#[derive(Debug, Default, Clone)]
pub struct LockOptions {
    pub cover: Option<String>,
    pub max_attempts: Option<u32>,
    pub wait: Option<u64>,
    pub conceal: bool,
    pub hidden: bool,
}

/// Execute the `lock` command.
pub fn execute(cli: &Cli, path: &Path, opts: &LockOptions) -> Result<()> {
    let (engine, settings, data_dir) = build_engine(cli)?;

    let policy = LockoutPolicy::new(
        opts.max_attempts.unwrap_or(settings.default_max_attempts),
        opts.wait.unwrap_or(settings.default_wait_seconds),
    )?;
    let protection = if opts.conceal {
        Protection::Conceal {
            hidden: opts.hidden,
        }
    } else {
        Protection::Encrypt
    };
    let cover = opts.cover.clone().unwrap_or_else(random_cover_name);

    let password = prompt_new_password(PASSWORD_ENV)?;
    let record = engine.create_vault(path, &password, policy, &cover, protection)?;

    log_audit(
        &data_dir,
        "lock",
        Some(&record.original_path),
        Some(&protection.to_string()),
    );

    output::success(&format!(
        "Sealed {} as {}",
        record.original_path.display(),
        record.container_path.display()
    ));
    output::tip(&format!(
        "{} wrong password(s) lock it for {}s. Run `foldervault unlock {}` to restore it.",
        policy.max_attempts(),
        policy.wait_seconds(),
        record.original_path.display()
    ));

    Ok(())
}

/// A cover name that says nothing about the folder's contents.
fn random_cover_name() -> String {
    let mut bytes = [0u8; 6];
    rand::rng().fill_bytes(&mut bytes);
    format!("fv-{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_cover_names_are_valid_and_distinct() {
        let a = random_cover_name();
        let b = random_cover_name();
        assert_ne!(a, b);
        assert_eq!(a.len(), 15);
        assert!(crate::vault::engine::validate_cover_name(&a).is_ok());
    }
}
