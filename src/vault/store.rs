//! Encrypted registry persistence.
//!
//! `VaultStore` owns the registry artifact.  Loading is fail-safe: a
//! missing, undecryptable, or unparsable registry reads as empty so the
//! application never crashes on a bad file.  Saving is strict: every
//! error propagates.
//!
//! There is no cross-process locking.  Callers treat load → modify →
//! save as one logical transaction; two writers racing on the same
//! registry lose an update (last write wins).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::format;
use super::record::Registry;
use crate::errors::Result;
use crate::keystore::MasterKeyStore;

/// What `load_with_status` found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    /// No registry artifact yet.
    Missing,
    /// Artifact decrypted and parsed.
    Loaded,
    /// Artifact exists but could not be read; treated as empty.
    Unreadable(String),
}

/// Handle to the encrypted registry artifact.
pub struct VaultStore {
    path: PathBuf,
    keys: Arc<MasterKeyStore>,
}

impl VaultStore {
    /// Artifact file name inside the data directory.
    pub const FILE_NAME: &'static str = "registry.fvr";

    pub fn new(path: PathBuf, keys: Arc<MasterKeyStore>) -> Self {
        Self { path, keys }
    }

    /// Path of the registry artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, degrading every failure to an empty registry.
    pub fn load(&self) -> Registry {
        self.load_with_status().0
    }

    /// Load the registry and report whether it was missing, loaded, or
    /// unreadable.
    ///
    /// An unreadable artifact is copied aside (`.registry.fvr.unreadable`)
    /// before the next save can overwrite it.
    pub fn load_with_status(&self) -> (Registry, RegistryStatus) {
        if !self.path.exists() {
            return (Registry::new(), RegistryStatus::Missing);
        }

        match self.try_load() {
            Ok(registry) => (registry, RegistryStatus::Loaded),
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(
                    path = %self.path.display(),
                    error = %reason,
                    "registry could not be decrypted; treating it as empty"
                );
                self.preserve_unreadable();
                (Registry::new(), RegistryStatus::Unreadable(reason))
            }
        }
    }

    fn try_load(&self) -> Result<Registry> {
        let data = fs::read(&self.path)?;
        let master = self.keys.obtain_key()?;
        let key = master.registry_key()?;
        format::decode_registry(&data, &key[..])
    }

    fn preserve_unreadable(&self) {
        let backup = crate::platform::temp_sibling(&self.path, "unreadable");
        if backup.exists() {
            return;
        }
        match fs::copy(&self.path, &backup) {
            Ok(_) => tracing::warn!(backup = %backup.display(), "kept a copy of the unreadable registry"),
            Err(e) => tracing::warn!(error = %e, "could not copy the unreadable registry aside"),
        }
    }

    /// Encrypt and atomically persist `registry`, then restrict the
    /// artifact to the current user.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let master = self.keys.obtain_key()?;
        let key = master.registry_key()?;
        let blob = format::encode_registry(registry, &key[..])?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        crate::platform::write_atomic(&self.path, &blob)?;
        crate::platform::restrict_file(&self.path)?;

        tracing::debug!(vaults = registry.len(), "registry saved");
        Ok(())
    }
}
