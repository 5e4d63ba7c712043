//! Machine-bound master key storage.
//!
//! The master key is generated once, wrapped by a `KeySealer` (an
//! identity-bound seal/unseal primitive), and persisted as a small
//! artifact in the data directory:
//!
//! ```text
//! [FVKS: 4 bytes][version: 1 byte][backend tag: 1 byte][sealer blob]
//! ```
//!
//! Anyone who can run as this user on this machine can obtain the key,
//! and with it decrypt every container.  Vault passwords gate opening;
//! they do not encrypt content.
//!
//! The sealer blob is opaque to this module.  Once a key exists it is
//! never silently replaced: if the artifact cannot be unsealed the store
//! reports `KeyUnavailable`, because a fresh key would orphan every
//! container and the registry.

#[cfg(feature = "keyring-store")]
pub mod keyring;
pub mod passphrase;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::crypto::MasterKey;
use crate::errors::{FolderVaultError, Result};

#[cfg(feature = "keyring-store")]
pub use self::keyring::KeyringSealer;
pub use passphrase::PassphraseSealer;

/// Magic bytes at the start of the key artifact.
const MAGIC: &[u8; 4] = b"FVKS";

/// Current key artifact version.
const VERSION: u8 = 1;

/// 4 (magic) + 1 (version) + 1 (backend tag).
const PREFIX_LEN: usize = 6;

/// Which sealing primitive produced a key artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealerBackend {
    Passphrase,
    Keyring,
}

impl SealerBackend {
    fn tag(self) -> u8 {
        match self {
            Self::Passphrase => 1,
            Self::Keyring => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Passphrase),
            2 => Some(Self::Keyring),
            _ => None,
        }
    }
}

impl std::fmt::Display for SealerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passphrase => f.write_str("passphrase"),
            Self::Keyring => f.write_str("keyring"),
        }
    }
}

/// Identity-bound wrap/unwrap primitive for the master key.
///
/// `unseal` must fail for a blob produced under a different user or
/// machine identity.
pub trait KeySealer: Send + Sync {
    fn backend(&self) -> SealerBackend;
    fn seal(&self, key: &[u8]) -> Result<Vec<u8>>;
    fn unseal(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Obtains the content-encryption master key, creating it on first use.
pub struct MasterKeyStore {
    path: PathBuf,
    sealer: Box<dyn KeySealer>,
    cached: Mutex<Option<CachedKey>>,
}

/// The unsealed key plus the exact artifact bytes it came from.
struct CachedKey {
    key: MasterKey,
    artifact: Vec<u8>,
}

impl MasterKeyStore {
    /// Artifact file name inside the data directory.
    pub const FILE_NAME: &'static str = "master.key";

    pub fn new(path: PathBuf, sealer: Box<dyn KeySealer>) -> Self {
        Self {
            path,
            sealer,
            cached: Mutex::new(None),
        }
    }

    /// Path of the sealed key artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the master key.
    ///
    /// The first successful call caches the key for the life of the
    /// process.  Every later call re-reads the artifact and serves the
    /// cached key only while the bytes are unchanged, so a key removed or
    /// replaced mid-process yields `KeyUnavailable` rather than a stale
    /// or regenerated key.
    pub fn obtain_key(&self) -> Result<MasterKey> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| FolderVaultError::KeyUnavailable("key cache poisoned".into()))?;

        if let Some(entry) = cached.as_ref() {
            if !self.path.exists() {
                tracing::error!(path = %self.path.display(), "sealed key artifact disappeared");
                return Err(FolderVaultError::KeyUnavailable(format!(
                    "key artifact {} was removed",
                    self.path.display()
                )));
            }
            if self.read_artifact()? != entry.artifact {
                tracing::error!(path = %self.path.display(), "sealed key artifact changed");
                return Err(FolderVaultError::KeyUnavailable(format!(
                    "key artifact {} changed while in use",
                    self.path.display()
                )));
            }
            return Ok(entry.key.clone());
        }

        let entry = if self.path.exists() {
            self.load_artifact()?
        } else {
            self.create_artifact()?
        };

        let key = entry.key.clone();
        *cached = Some(entry);
        Ok(key)
    }

    fn read_artifact(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| {
            FolderVaultError::KeyUnavailable(format!("cannot read key artifact: {e}"))
        })
    }

    /// Read and unseal an existing artifact.
    fn load_artifact(&self) -> Result<CachedKey> {
        check_owner(&self.path)?;

        let data = self.read_artifact()?;

        if data.len() < PREFIX_LEN || &data[0..4] != MAGIC {
            return Err(FolderVaultError::KeyUnavailable(
                "key artifact is not a FolderVault key".into(),
            ));
        }
        if data[4] != VERSION {
            return Err(FolderVaultError::KeyUnavailable(format!(
                "unsupported key artifact version {}",
                data[4]
            )));
        }

        let backend = SealerBackend::from_tag(data[5]).ok_or_else(|| {
            FolderVaultError::KeyUnavailable(format!("unknown key backend tag {}", data[5]))
        })?;
        if backend != self.sealer.backend() {
            return Err(FolderVaultError::KeyUnavailable(format!(
                "key was sealed with the {backend} backend, but the {} backend is configured",
                self.sealer.backend()
            )));
        }

        let bytes = self.sealer.unseal(&data[PREFIX_LEN..])?;
        let key = MasterKey::from_slice(&bytes)?;
        tracing::debug!(backend = %backend, "master key unsealed");
        Ok(CachedKey {
            key,
            artifact: data,
        })
    }

    /// Generate, seal, and persist a brand-new key.
    fn create_artifact(&self) -> Result<CachedKey> {
        let key = MasterKey::generate();
        let blob = self.sealer.seal(key.as_bytes())?;

        // Refuse to persist anything the sealer cannot open again.
        let check = self.sealer.unseal(&blob)?;
        if check.as_slice() != key.as_bytes() {
            return Err(FolderVaultError::KeyUnavailable(
                "sealer round-trip check failed".into(),
            ));
        }

        let mut buf = Vec::with_capacity(PREFIX_LEN + blob.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.push(self.sealer.backend().tag());
        buf.extend_from_slice(&blob);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        crate::platform::write_atomic(&self.path, &buf)?;
        crate::platform::restrict_file(&self.path)?;

        tracing::info!(
            path = %self.path.display(),
            backend = %self.sealer.backend(),
            "created new master key"
        );
        Ok(CachedKey { key, artifact: buf })
    }
}

/// On Unix, the artifact must belong to the effective user.
#[cfg(unix)]
fn check_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let meta = fs::metadata(path)
        .map_err(|e| FolderVaultError::KeyUnavailable(format!("cannot stat key artifact: {e}")))?;
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if meta.uid() != euid {
        return Err(FolderVaultError::KeyUnavailable(format!(
            "key artifact is owned by uid {}, not the current user ({euid})",
            meta.uid()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_owner(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2Params;
    use tempfile::TempDir;

    fn store(dir: &TempDir, passphrase: &str) -> MasterKeyStore {
        let sealer = PassphraseSealer::new(passphrase, Argon2Params::minimum()).unwrap();
        MasterKeyStore::new(dir.path().join(MasterKeyStore::FILE_NAME), Box::new(sealer))
    }

    #[test]
    fn first_call_creates_artifact() {
        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");

        keys.obtain_key().unwrap();
        let data = fs::read(keys.path()).unwrap();
        assert_eq!(&data[0..4], MAGIC);
        assert_eq!(data[5], SealerBackend::Passphrase.tag());
    }

    #[test]
    fn key_is_stable_across_calls_and_instances() {
        let dir = TempDir::new().unwrap();
        let first = store(&dir, "machine-secret").obtain_key().unwrap();

        let keys = store(&dir, "machine-secret");
        let second = keys.obtain_key().unwrap();
        let third = keys.obtain_key().unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(second.as_bytes(), third.as_bytes());
    }

    #[test]
    fn wrong_identity_fails_without_replacing_key() {
        let dir = TempDir::new().unwrap();
        store(&dir, "machine-secret").obtain_key().unwrap();
        let before = fs::read(dir.path().join(MasterKeyStore::FILE_NAME)).unwrap();

        let err = store(&dir, "someone-else").obtain_key().unwrap_err();
        assert!(matches!(err, FolderVaultError::KeyUnavailable(_)));

        let after = fs::read(dir.path().join(MasterKeyStore::FILE_NAME)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn corrupted_artifact_is_unavailable() {
        let dir = TempDir::new().unwrap();
        store(&dir, "machine-secret").obtain_key().unwrap();

        let path = dir.path().join(MasterKeyStore::FILE_NAME);
        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        fs::write(&path, data).unwrap();

        let err = store(&dir, "machine-secret").obtain_key().unwrap_err();
        assert!(matches!(err, FolderVaultError::KeyUnavailable(_)));
    }

    #[test]
    fn removed_artifact_fails_for_a_running_process() {
        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");
        keys.obtain_key().unwrap();

        fs::remove_file(keys.path()).unwrap();
        let err = keys.obtain_key().unwrap_err();
        assert!(matches!(err, FolderVaultError::KeyUnavailable(_)));
        assert!(!keys.path().exists());
    }

    #[test]
    fn replaced_artifact_fails_for_a_running_process() {
        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");
        keys.obtain_key().unwrap();

        fs::write(keys.path(), b"garbage not a key").unwrap();
        let err = keys.obtain_key().unwrap_err();
        assert!(matches!(err, FolderVaultError::KeyUnavailable(_)));
    }

    #[test]
    fn resealed_artifact_is_not_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");
        keys.obtain_key().unwrap();

        // Another key sealed by the same identity still differs on disk.
        let other = TempDir::new().unwrap();
        store(&other, "machine-secret").obtain_key().unwrap();
        fs::copy(other.path().join(MasterKeyStore::FILE_NAME), keys.path()).unwrap();

        let err = keys.obtain_key().unwrap_err();
        assert!(matches!(err, FolderVaultError::KeyUnavailable(_)));
    }

    #[test]
    fn unchanged_artifact_keeps_serving_cached_key() {
        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");
        let first = keys.obtain_key().unwrap();
        let again = keys.obtain_key().unwrap();
        assert_eq!(first.as_bytes(), again.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn artifact_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let keys = store(&dir, "machine-secret");
        keys.obtain_key().unwrap();

        let mode = fs::metadata(keys.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
