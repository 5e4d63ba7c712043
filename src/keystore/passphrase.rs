//! Passphrase-wrapped key sealing.
//!
//! Used where no OS credential store is available.  The wrapping key is
//! derived from a user-supplied passphrase with Argon2id, so the master
//! key is exactly as strong as that passphrase.
//!
//! Blob layout:
//!   [ salt: 16 | memory_kib: u32 LE | iterations: u32 LE | parallelism: u32 LE | nonce || ct ]

use zeroize::{Zeroize, Zeroizing};

use super::{KeySealer, SealerBackend};
use crate::crypto::kdf::{derive_key_with_params, generate_salt, Argon2Params, SALT_LEN};
use crate::crypto::{open_blob, seal_blob};
use crate::errors::{FolderVaultError, Result};

const AAD: &[u8] = b"foldervault-passphrase-seal";

/// salt + three u32 parameters.
const HEADER_LEN: usize = SALT_LEN + 12;

/// Seals the master key under a passphrase-derived wrapping key.
pub struct PassphraseSealer {
    passphrase: Zeroizing<String>,
    params: Argon2Params,
}

impl PassphraseSealer {
    pub fn new(passphrase: &str, params: Argon2Params) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(FolderVaultError::KeyUnavailable(
                "key passphrase cannot be empty".into(),
            ));
        }
        Ok(Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
            params,
        })
    }
}

impl KeySealer for PassphraseSealer {
    fn backend(&self) -> SealerBackend {
        SealerBackend::Passphrase
    }

    fn seal(&self, key: &[u8]) -> Result<Vec<u8>> {
        let salt = generate_salt();
        let mut kek = derive_key_with_params(self.passphrase.as_bytes(), &salt, &self.params)?;
        let wrapped = seal_blob(&kek, key, AAD);
        kek.zeroize();
        let wrapped = wrapped?;

        let mut blob = Vec::with_capacity(HEADER_LEN + wrapped.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&self.params.memory_kib.to_le_bytes());
        blob.extend_from_slice(&self.params.iterations.to_le_bytes());
        blob.extend_from_slice(&self.params.parallelism.to_le_bytes());
        blob.extend_from_slice(&wrapped);
        Ok(blob)
    }

    fn unseal(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if blob.len() < HEADER_LEN {
            return Err(FolderVaultError::KeyUnavailable(
                "passphrase-sealed key is truncated".into(),
            ));
        }

        let (salt, rest) = blob.split_at(SALT_LEN);
        let params = Argon2Params {
            memory_kib: read_u32(&rest[0..4]),
            iterations: read_u32(&rest[4..8]),
            parallelism: read_u32(&rest[8..12]),
        };

        let mut kek = derive_key_with_params(self.passphrase.as_bytes(), salt, &params)
            .map_err(|e| FolderVaultError::KeyUnavailable(e.to_string()))?;
        let opened = open_blob(&kek, &rest[12..], AAD);
        kek.zeroize();

        opened.map(Zeroizing::new).map_err(|_| {
            FolderVaultError::KeyUnavailable(
                "wrong key passphrase or corrupted key artifact".into(),
            )
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
