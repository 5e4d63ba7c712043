//! `VaultEngine`: create, open, rekey, and inspect vaults.
//!
//! Every mutating call is one load → modify → save transaction against the
//! registry.  Filesystem changes happen before the registry is saved, and a
//! failed save after sealing rolls the seal back, so the registry never
//! points at a folder that is still in plaintext (or vice versa).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::archive;
use super::record::{Protection, Registry, VaultRecord, VaultSummary};
use super::store::{RegistryStatus, VaultStore};
use crate::config::Settings;
use crate::crypto::{hash_password, verify_password, Argon2Params, MasterKey};
use crate::errors::{FolderVaultError, Result};
use crate::keystore::{KeySealer, MasterKeyStore};
use crate::lockout::{Clock, LockState, LockoutPolicy, SystemClock};
use crate::platform::{AccessGuard, NativeGuard};

/// Longest cover name accepted (a single path component on most filesystems).
const MAX_COVER_LEN: usize = 255;

/// Orchestrates the key store, registry, archive cipher, and lockout policy.
pub struct VaultEngine {
    keys: Arc<MasterKeyStore>,
    store: VaultStore,
    kdf_params: Argon2Params,
    container_extension: String,
    clock: Box<dyn Clock>,
    guard: Box<dyn AccessGuard>,
}

impl VaultEngine {
    /// Build an engine whose artifacts live in `data_dir`.
    ///
    /// Nothing touches the disk until the first operation.
    pub fn new(data_dir: &Path, sealer: Box<dyn KeySealer>, settings: &Settings) -> Self {
        let keys = Arc::new(MasterKeyStore::new(
            data_dir.join(MasterKeyStore::FILE_NAME),
            sealer,
        ));
        let store = VaultStore::new(data_dir.join(VaultStore::FILE_NAME), Arc::clone(&keys));

        Self {
            keys,
            store,
            kdf_params: settings.argon2_params(),
            container_extension: settings.container_extension.clone(),
            clock: Box::new(SystemClock),
            guard: Box::new(NativeGuard),
        }
    }

    /// Replace the time source (tests use `ManualClock`).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the capability hooks.
    pub fn with_guard(mut self, guard: impl AccessGuard + 'static) -> Self {
        self.guard = Box::new(guard);
        self
    }

    /// Path of the encrypted registry artifact.
    pub fn registry_path(&self) -> &Path {
        self.store.path()
    }

    /// Whether the registry was missing, readable, or unreadable.
    pub fn registry_status(&self) -> RegistryStatus {
        self.store.load_with_status().1
    }

    // ------------------------------------------------------------------
    // createVault
    // ------------------------------------------------------------------

    /// Seal the folder at `path` behind `password`.
    ///
    /// Errors: `AlreadyManaged` if the folder is already registered,
    /// `NotFound` if it does not exist, `NameCollision` if the cover-name
    /// location is occupied.  If the container is written but the
    /// plaintext cannot be fully removed, the vault is still registered
    /// and `PartialSeal` is returned.
    pub fn create_vault(
        &self,
        path: &Path,
        password: &str,
        policy: LockoutPolicy,
        cover_name: &str,
        protection: Protection,
    ) -> Result<VaultRecord> {
        require_password(password)?;
        validate_cover_name(cover_name)?;

        let path = resolve_path(path)?;
        let mut registry = self.store.load();
        if registry.contains(&path) {
            return Err(FolderVaultError::AlreadyManaged(path));
        }

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(FolderVaultError::NotFound(format!(
                    "{} is not a folder",
                    path.display()
                )))
            }
            Err(_) => {
                return Err(FolderVaultError::NotFound(format!(
                    "{} does not exist",
                    path.display()
                )))
            }
        }

        let data_dir = self
            .keys
            .path()
            .parent()
            .map_or_else(|| self.keys.path().to_path_buf(), Path::to_path_buf);
        let data_dir = fs::canonicalize(&data_dir).or_else(|_| resolve_path(&data_dir))?;
        if data_dir.starts_with(&path) {
            return Err(FolderVaultError::InvalidInput(format!(
                "{} contains FolderVault's own data directory",
                path.display()
            )));
        }

        let container_path = self.container_path_for(&path, cover_name, protection)?;
        if fs::symlink_metadata(&container_path).is_ok() {
            return Err(FolderVaultError::NameCollision(container_path));
        }

        // Fail on an unusable key before anything on disk changes.
        let master = self.keys.obtain_key()?;
        let hashed = hash_password(password.as_bytes(), None, &self.kdf_params)?;

        let record = VaultRecord {
            original_path: path.clone(),
            password_hash: hashed.hash_hex,
            password_salt: hashed.salt_hex,
            kdf_params: self.kdf_params,
            policy,
            cover_name: cover_name.to_string(),
            lock: LockState::default(),
            sealed_at: self.clock.now(),
            protection,
            container_path: container_path.clone(),
        };

        let partial = match self.seal(&path, &container_path, protection, &master) {
            Ok(()) => None,
            Err(e @ FolderVaultError::PartialSeal { .. }) => Some(e),
            Err(e) => return Err(e),
        };

        registry.insert(record.clone());
        if let Err(save_err) = self.store.save(&registry) {
            tracing::error!(error = %save_err, "registry save failed after sealing; rolling back");
            if partial.is_none() {
                self.rollback_seal(&record, &master);
            }
            return Err(save_err);
        }

        if let Some(e) = partial {
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            container = %container_path.display(),
            protection = %protection,
            "vault created"
        );
        Ok(record)
    }

    fn container_path_for(
        &self,
        path: &Path,
        cover_name: &str,
        protection: Protection,
    ) -> Result<PathBuf> {
        let parent = path.parent().ok_or_else(|| {
            FolderVaultError::InvalidInput(format!("{} has no parent folder", path.display()))
        })?;
        let file_name = match protection {
            Protection::Encrypt => {
                archive::container_file_name(cover_name, &self.container_extension)
            }
            Protection::Conceal { .. } => cover_name.to_string(),
        };
        Ok(parent.join(file_name))
    }

    fn seal(
        &self,
        path: &Path,
        container_path: &Path,
        protection: Protection,
        master: &MasterKey,
    ) -> Result<()> {
        match protection {
            Protection::Encrypt => {
                let content_key = master.content_key()?;
                let report = archive::seal(path, container_path, &content_key[..]);
                // The container exists in both the Ok and PartialSeal cases.
                if matches!(report, Ok(_) | Err(FolderVaultError::PartialSeal { .. })) {
                    self.harden(container_path, false);
                }
                let report = report?;
                tracing::debug!(
                    files = report.files,
                    directories = report.directories,
                    bytes = report.container_bytes,
                    "folder sealed"
                );
                Ok(())
            }
            Protection::Conceal { hidden } => {
                fs::rename(path, container_path)?;
                self.harden(container_path, hidden);
                Ok(())
            }
        }
    }

    /// Undo a completed seal after the registry could not record it.
    fn rollback_seal(&self, record: &VaultRecord, master: &MasterKey) {
        let result = match record.protection {
            Protection::Encrypt => master.content_key().and_then(|key| {
                self.release(&record.container_path);
                archive::unseal(&record.container_path, &key[..], &record.original_path)
                    .map(|_| ())
            }),
            Protection::Conceal { .. } => {
                self.release(&record.container_path);
                fs::rename(&record.container_path, &record.original_path).map_err(Into::into)
            }
        };

        if let Err(e) = result {
            tracing::error!(
                container = %record.container_path.display(),
                error = %e,
                "rollback failed; the sealed copy is still at the container path"
            );
        }
    }

    // ------------------------------------------------------------------
    // openVault
    // ------------------------------------------------------------------

    /// Check `password` and restore the folder, removing its record.
    ///
    /// Returns the restored path.  A wrong password updates the lockout
    /// counters and returns `InvalidCredentials` or `LockedOut`.
    pub fn open_vault(&self, path: &Path, password: &str) -> Result<PathBuf> {
        let path = resolve_path(path)?;
        let mut registry = self.store.load();
        self.check_password(&mut registry, &path, password)?;

        let record = registry
            .get(&path)
            .cloned()
            .ok_or_else(|| not_managed(&path))?;

        let container_present = fs::symlink_metadata(&record.container_path).is_ok();
        if !container_present && path.exists() {
            // Seal or unseal was interrupted after the plaintext came back.
            tracing::warn!(
                path = %path.display(),
                "container missing but folder present; dropping stale record"
            );
            registry.remove(&path);
            self.store.save(&registry)?;
            return Ok(path);
        }

        self.restore(&record)?;

        registry.remove(&path);
        self.store.save(&registry)?;

        tracing::info!(path = %path.display(), "vault opened");
        Ok(path)
    }

    fn restore(&self, record: &VaultRecord) -> Result<()> {
        match record.protection {
            Protection::Encrypt => {
                let master = self.keys.obtain_key()?;
                let content_key = master.content_key()?;
                let report = archive::unseal(
                    &record.container_path,
                    &content_key[..],
                    &record.original_path,
                )?;
                if report.leftover_container {
                    tracing::warn!(
                        container = %record.container_path.display(),
                        "delete the leftover container by hand"
                    );
                }
                Ok(())
            }
            Protection::Conceal { .. } => {
                if fs::symlink_metadata(&record.original_path).is_ok() {
                    return Err(FolderVaultError::NameCollision(
                        record.original_path.clone(),
                    ));
                }
                if fs::symlink_metadata(&record.container_path).is_err() {
                    return Err(FolderVaultError::NotFound(format!(
                        "concealed folder {} is missing",
                        record.container_path.display()
                    )));
                }
                self.release(&record.container_path);
                fs::rename(&record.container_path, &record.original_path)?;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // rekeyVault
    // ------------------------------------------------------------------

    /// Replace the password of a sealed vault.
    ///
    /// The sealed content is not re-encrypted: it is protected by the
    /// master key, not by the password.
    pub fn rekey_vault(&self, path: &Path, current: &str, new_password: &str) -> Result<()> {
        require_password(new_password)?;

        let path = resolve_path(path)?;
        let mut registry = self.store.load();
        self.check_password(&mut registry, &path, current)?;

        let hashed = hash_password(new_password.as_bytes(), None, &self.kdf_params)?;
        let record = registry.get_mut(&path).ok_or_else(|| not_managed(&path))?;
        record.password_hash = hashed.hash_hex;
        record.password_salt = hashed.salt_hex;
        record.kdf_params = self.kdf_params;

        self.store.save(&registry)?;
        tracing::info!(path = %path.display(), "vault password changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // peek
    // ------------------------------------------------------------------

    /// Decrypt a copy of an encrypted vault into a new folder `dest`,
    /// leaving the container and record in place.
    ///
    /// Returns the number of entries written.
    pub fn peek_vault(&self, path: &Path, password: &str, dest: &Path) -> Result<usize> {
        let path = resolve_path(path)?;
        let dest = resolve_path(dest)?;
        let mut registry = self.store.load();

        let record = registry.get(&path).ok_or_else(|| not_managed(&path))?;
        if record.protection != Protection::Encrypt {
            return Err(FolderVaultError::InvalidInput(format!(
                "{} is concealed, not encrypted; unlock it instead",
                path.display()
            )));
        }

        let had_failures = record.lock != LockState::default();
        self.check_password(&mut registry, &path, password)?;
        if had_failures {
            self.store.save(&registry)?;
        }

        let record = registry.get(&path).ok_or_else(|| not_managed(&path))?;
        let master = self.keys.obtain_key()?;
        let content_key = master.content_key()?;
        let entries = archive::extract(&record.container_path, &content_key[..], &dest)?;

        tracing::info!(path = %path.display(), dest = %dest.display(), entries, "vault peeked");
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every sealed folder, in path order.
    pub fn list_vaults(&self) -> Vec<VaultSummary> {
        let now = self.clock.now();
        self.store
            .load()
            .records()
            .map(|r| VaultSummary {
                original_path: r.original_path.clone(),
                container_path: r.container_path.clone(),
                cover_name: r.cover_name.clone(),
                protection: r.protection,
                sealed_at: r.sealed_at,
                attempts: r.lock.attempts,
                max_attempts: r.policy.max_attempts(),
                remaining_lockout_secs: r.policy.remaining(&r.lock, now),
            })
            .collect()
    }

    /// Seconds until `path` accepts another attempt; 0 when not locked.
    pub fn remaining_lockout_seconds(&self, path: &Path) -> Result<u64> {
        let path = resolve_path(path)?;
        let registry = self.store.load();
        let record = registry.get(&path).ok_or_else(|| not_managed(&path))?;
        Ok(record.policy.remaining(&record.lock, self.clock.now()))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Gate, verify, and on failure persist the updated counters.
    ///
    /// On success the lock state is reset in `registry` but not saved.
    fn check_password(&self, registry: &mut Registry, path: &Path, password: &str) -> Result<()> {
        let now = self.clock.now();
        let record = registry.get_mut(path).ok_or_else(|| not_managed(path))?;
        let policy = record.policy;

        policy.ensure_active(&record.lock, now)?;

        let ok = verify_password(
            password.as_bytes(),
            &record.password_salt,
            &record.password_hash,
            &record.kdf_params,
        )?;
        if ok {
            policy.register_success(&mut record.lock);
            return Ok(());
        }

        let outcome = policy.register_failure(&mut record.lock, now);
        tracing::warn!(path = %path.display(), ?outcome, "wrong vault password");
        self.store.save(registry)?;
        Err(outcome.into_error())
    }

    fn harden(&self, path: &Path, hide: bool) {
        if hide {
            if let Err(e) = self.guard.hide_from_browsing(path) {
                tracing::warn!(path = %path.display(), error = %e, "could not hide sealed folder");
            }
        }
        if let Err(e) = self.guard.restrict_access(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not restrict access");
        }
    }

    fn release(&self, path: &Path) {
        if let Err(e) = self.guard.restore_access(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not restore access");
        }
    }
}

fn not_managed(path: &Path) -> FolderVaultError {
    FolderVaultError::NotFound(format!("{} is not a sealed folder", path.display()))
}

fn require_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(FolderVaultError::InvalidInput(
            "password cannot be empty".into(),
        ));
    }
    Ok(())
}

/// A cover name is a single, non-empty path component.
pub fn validate_cover_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("cannot be empty")
    } else if name == "." || name == ".." {
        Some("cannot be '.' or '..'")
    } else if name.contains(['/', '\\', '\0']) {
        Some("cannot contain path separators")
    } else if name.len() > MAX_COVER_LEN {
        Some("is too long")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(FolderVaultError::InvalidCoverName(format!(
            "'{name}' {reason}"
        ))),
        None => Ok(()),
    }
}

/// Absolute form of `path` used as the registry key.
///
/// The parent is canonicalized when it exists, so `./a` and `/cwd/a`
/// name the same vault even after the folder itself is gone.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let name = absolute.file_name().ok_or_else(|| {
        FolderVaultError::InvalidInput(format!("{} does not name a folder", path.display()))
    })?;
    let parent = absolute.parent().ok_or_else(|| {
        FolderVaultError::InvalidInput(format!("{} has no parent folder", path.display()))
    })?;

    let parent = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    Ok(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_names_must_be_single_components() {
        assert!(validate_cover_name("holiday photos").is_ok());
        assert!(validate_cover_name("").is_err());
        assert!(validate_cover_name("   ").is_err());
        assert!(validate_cover_name("..").is_err());
        assert!(validate_cover_name("a/b").is_err());
        assert!(validate_cover_name("a\\b").is_err());
        assert!(validate_cover_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn resolve_path_is_absolute_and_canonical() {
        let tmp = tempfile::TempDir::new().unwrap();
        let canonical_root = fs::canonicalize(tmp.path()).unwrap();

        let resolved = resolve_path(&tmp.path().join("missing")).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, canonical_root.join("missing"));
    }

    #[test]
    fn resolve_path_rejects_parent_components() {
        assert!(resolve_path(Path::new("/tmp/..")).is_err());
    }
}
