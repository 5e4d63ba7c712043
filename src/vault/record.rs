//! Vault records and the in-memory registry.
//!
//! A `VaultRecord` is everything needed to restore one sealed folder.
//! New fields must be `#[serde(default)]` so older registries still load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::lockout::{LockState, LockoutPolicy};

/// How a folder is protected while sealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Protection {
    /// Packed, compressed, and encrypted into a container file.
    #[default]
    Encrypt,
    /// Renamed to the cover name and access-restricted; not encrypted.
    Conceal { hidden: bool },
}

impl std::fmt::Display for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encrypt => f.write_str("encrypted"),
            Self::Conceal { hidden: true } => f.write_str("concealed (hidden)"),
            Self::Conceal { hidden: false } => f.write_str("concealed"),
        }
    }
}

/// One sealed folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Absolute path of the folder before sealing (registry key).
    pub original_path: PathBuf,

    /// Hex Argon2id digest of the vault password.
    pub password_hash: String,

    /// Hex salt, unique per record.
    pub password_salt: String,

    /// KDF cost used for `password_hash`.
    #[serde(default)]
    pub kdf_params: Argon2Params,

    #[serde(flatten)]
    pub policy: LockoutPolicy,

    /// User-visible alias of the sealed artifact.
    pub cover_name: String,

    #[serde(flatten)]
    pub lock: LockState,

    /// Epoch seconds when the folder was sealed.
    pub sealed_at: u64,

    #[serde(default)]
    pub protection: Protection,

    /// Where the sealed artifact lives.
    pub container_path: PathBuf,
}

/// Read-only view of a record for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSummary {
    pub original_path: PathBuf,
    pub container_path: PathBuf,
    pub cover_name: String,
    pub protection: Protection,
    pub sealed_at: u64,
    pub attempts: u32,
    pub max_attempts: u32,
    pub remaining_lockout_secs: u64,
}

/// Ordered mapping `original_path -> VaultRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    vaults: BTreeMap<PathBuf, VaultRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&VaultRecord> {
        self.vaults.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut VaultRecord> {
        self.vaults.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.vaults.contains_key(path)
    }

    /// Insert or replace the record keyed by its `original_path`.
    pub fn insert(&mut self, record: VaultRecord) -> Option<VaultRecord> {
        self.vaults.insert(record.original_path.clone(), record)
    }

    pub fn remove(&mut self, path: &Path) -> Option<VaultRecord> {
        self.vaults.remove(path)
    }

    /// Records in `original_path` order.
    pub fn records(&self) -> impl Iterator<Item = &VaultRecord> {
        self.vaults.values()
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }
}

impl FromIterator<VaultRecord> for Registry {
    fn from_iter<I: IntoIterator<Item = VaultRecord>>(iter: I) -> Self {
        let mut registry = Self::new();
        for record in iter {
            registry.insert(record);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str) -> VaultRecord {
        VaultRecord {
            original_path: PathBuf::from(path),
            password_hash: "ab".repeat(32),
            password_salt: "cd".repeat(16),
            kdf_params: Argon2Params::minimum(),
            policy: LockoutPolicy::new(3, 5).unwrap(),
            cover_name: "notes".into(),
            lock: LockState::default(),
            sealed_at: 1_700_000_000,
            protection: Protection::Encrypt,
            container_path: PathBuf::from("/tmp/notes.fvault"),
        }
    }

    #[test]
    fn registry_is_ordered_by_path() {
        let registry: Registry = [sample("/b"), sample("/a"), sample("/c")]
            .into_iter()
            .collect();
        let paths: Vec<_> = registry
            .records()
            .map(|r| r.original_path.clone())
            .collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
    }

    #[test]
    fn record_json_is_flat() {
        let json = serde_json::to_value(sample("/a")).unwrap();
        assert_eq!(json["max_attempts"], 3);
        assert_eq!(json["wait_seconds"], 5);
        assert_eq!(json["attempts"], 0);
        assert_eq!(json["locked_until"], 0);
        assert_eq!(json["protection"]["mode"], "encrypt");
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let mut json = serde_json::to_value(sample("/a")).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("protection");
        obj.remove("kdf_params");

        let record: VaultRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.protection, Protection::Encrypt);
        assert_eq!(record.kdf_params, Argon2Params::default());
    }

    #[test]
    fn conceal_protection_roundtrips() {
        let mut record = sample("/a");
        record.protection = Protection::Conceal { hidden: true };
        let json = serde_json::to_string(&record).unwrap();
        let back: VaultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.protection, Protection::Conceal { hidden: true });
    }
}
