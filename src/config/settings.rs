use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{FolderVaultError, Result};

/// Which primitive seals the master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyBackend {
    /// OS credential store (requires the `keyring-store` feature).
    Keyring,
    /// Passphrase-wrapped key, for platforms without a credential store.
    Passphrase,
}

/// Installation-level configuration, loaded from `<data_dir>/config.toml`.
///
/// Every field has a sensible default so FolderVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// File extension for encrypted containers (without the dot).
    #[serde(default = "default_container_extension")]
    pub container_extension: String,

    /// Failed attempts allowed before a lockout, when not given per vault.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    /// Lockout length in seconds, when not given per vault.
    #[serde(default = "default_wait_seconds")]
    pub default_wait_seconds: u64,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// How the master key is sealed on disk.
    #[serde(default = "default_key_backend")]
    pub key_backend: KeyBackend,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_container_extension() -> String {
    "fvault".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_wait_seconds() -> u64 {
    30
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_key_backend() -> KeyBackend {
    if cfg!(feature = "keyring-store") {
        KeyBackend::Keyring
    } else {
        KeyBackend::Passphrase
    }
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            container_extension: default_container_extension(),
            default_max_attempts: default_max_attempts(),
            default_wait_seconds: default_wait_seconds(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            key_backend: default_key_backend(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the data directory.
    pub const FILE_NAME: &'static str = "config.toml";

    /// Environment variable that overrides the data directory.
    pub const HOME_ENV: &'static str = "FOLDERVAULT_HOME";

    /// Load settings from `<data_dir>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            FolderVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make every vault unusable.
    pub fn validate(&self) -> Result<()> {
        let ext = &self.container_extension;
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(FolderVaultError::ConfigError(format!(
                "container_extension '{ext}' must be a bare extension like \"fvault\""
            )));
        }
        crate::lockout::LockoutPolicy::new(self.default_max_attempts, self.default_wait_seconds)
            .map_err(|e| FolderVaultError::ConfigError(e.to_string()))?;
        Ok(())
    }

    /// Resolve the data directory: explicit flag, then `FOLDERVAULT_HOME`,
    /// then the platform's per-user data location.
    pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = non_empty_env(Self::HOME_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let base = if cfg!(windows) {
            non_empty_env("LOCALAPPDATA").or_else(|| non_empty_env("APPDATA"))
        } else {
            non_empty_env("XDG_DATA_HOME")
                .or_else(|| non_empty_env("HOME").map(|h| format!("{h}/.local/share")))
        };

        base.map(|b| PathBuf::from(b).join("foldervault")).ok_or_else(|| {
            FolderVaultError::ConfigError(format!(
                "cannot determine a data directory — set {} or pass --data-dir",
                Self::HOME_ENV
            ))
        })
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.container_extension, "fvault");
        assert_eq!(s.default_max_attempts, 3);
        assert_eq!(s.default_wait_seconds, 30);
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.container_extension, "fvault");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
container_extension = "locked"
default_max_attempts = 5
default_wait_seconds = 120
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
key_backend = "passphrase"
"#;
        fs::write(tmp.path().join("config.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.container_extension, "locked");
        assert_eq!(settings.default_max_attempts, 5);
        assert_eq!(settings.default_wait_seconds, 120);
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.key_backend, KeyBackend::Passphrase);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "default_wait_seconds = 10\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_wait_seconds, 10);
        assert_eq!(settings.container_extension, "fvault");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "not valid {{toml").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_zero_attempts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "default_max_attempts = 0\n").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_dotted_extension() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "container_extension = \".x\"\n").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = Settings::data_dir(Some(Path::new("/srv/fv"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/fv"));
    }
}
