//! OS keyring key sealing.
//!
//! A random wrapping key lives in the operating system's credential
//! store, which is scoped to the logged-in user:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: kernel keyring
//!
//! The on-disk blob is the master key encrypted under that wrapping key,
//! so copying the artifact to another account or machine is useless.

use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use super::{KeySealer, SealerBackend};
use crate::crypto::{open_blob, seal_blob};
use crate::errors::{FolderVaultError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "foldervault";

const AAD: &[u8] = b"foldervault-keyring-seal";

const WRAP_KEY_LEN: usize = 32;

/// Seals the master key with a wrapping key held by the OS keyring.
pub struct KeyringSealer {
    account: String,
}

impl KeyringSealer {
    /// One keyring entry per key artifact path.
    pub fn new(artifact_path: &std::path::Path) -> Self {
        Self {
            account: format!("master-key:{}", artifact_path.display()),
        }
    }

    fn entry(&self) -> Result<::keyring::Entry> {
        ::keyring::Entry::new(SERVICE_NAME, &self.account).map_err(|e| {
            FolderVaultError::KeyringError(format!("failed to create keyring entry: {e}"))
        })
    }
}

impl KeySealer for KeyringSealer {
    fn backend(&self) -> SealerBackend {
        SealerBackend::Keyring
    }

    fn seal(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut wrap = [0u8; WRAP_KEY_LEN];
        rand::rng().fill_bytes(&mut wrap);

        let stored = self.entry()?.set_secret(&wrap).map_err(|e| {
            FolderVaultError::KeyringError(format!("failed to store wrapping key: {e}"))
        });
        let sealed = stored.and_then(|()| seal_blob(&wrap, key, AAD));
        wrap.zeroize();
        sealed
    }

    fn unseal(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let wrap = match self.entry()?.get_secret() {
            Ok(secret) => Zeroizing::new(secret),
            Err(::keyring::Error::NoEntry) => {
                return Err(FolderVaultError::KeyUnavailable(
                    "no wrapping key for this user in the OS keyring".into(),
                ));
            }
            Err(e) => {
                return Err(FolderVaultError::KeyUnavailable(format!(
                    "failed to read from keyring: {e}"
                )));
            }
        };

        open_blob(&wrap, blob, AAD).map(Zeroizing::new).map_err(|_| {
            FolderVaultError::KeyUnavailable(
                "keyring wrapping key does not match the key artifact".into(),
            )
        })
    }
}
