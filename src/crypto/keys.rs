//! Key derivation helpers using HKDF-SHA256.
//!
//! From the single machine-bound master key we derive:
//! - A **registry** key that encrypts the vault metadata registry.
//! - A **content** key that encrypts sealed folder containers.
//!
//! HKDF (RFC 5869) uses the master key as input keying material (IKM)
//! and a context string (`info`) to produce independent sub-keys.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{FolderVaultError, Result};

/// Length of the master key and of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

const REGISTRY_INFO: &[u8] = b"foldervault-registry-key";
const CONTENT_INFO: &[u8] = b"foldervault-content-key";

/// Derive the registry encryption key from the master key.
pub fn derive_registry_key(master_key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(master_key, REGISTRY_INFO)
}

/// Derive the container encryption key from the master key.
pub fn derive_content_key(master_key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(master_key, CONTENT_INFO)
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The master key is uniformly random, so HKDF runs with an empty salt.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| FolderVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        let key = Self::new(bytes);
        bytes.zeroize();
        key
    }

    /// Build a key from an unsealed byte buffer, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            FolderVaultError::KeyUnavailable(format!(
                "unsealed key has {} bytes, expected {KEY_LEN}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(array))
    }

    /// Access the raw key bytes (e.g. to hand to a sealer).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the registry encryption key from this master key.
    pub fn registry_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_registry_key(&self.bytes)
    }

    /// Derive the container encryption key from this master key.
    pub fn content_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_content_key(&self.bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
