//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal_blob` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `open_blob` splits the nonce back out
//! before decrypting.  Callers may bind a plaintext header (magic bytes,
//! format version) as associated data so it cannot be swapped.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{FolderVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext`, authenticating `aad` alongside it.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
pub fn seal_blob(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| FolderVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| FolderVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a blob produced by `seal_blob` with the same `aad`.
///
/// Any mismatch (wrong key, flipped bit, different header) is reported
/// as `DecryptionFailed` without revealing which check tripped.
pub fn open_blob(key: &[u8], ciphertext_with_nonce: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if ciphertext_with_nonce.len() < NONCE_LEN + TAG_LEN {
        return Err(FolderVaultError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| FolderVaultError::DecryptionFailed)?;

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| FolderVaultError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associated_data_must_match() {
        let key = [0x11u8; 32];
        let blob = seal_blob(&key, b"payload", b"FVLT\x01").unwrap();

        assert_eq!(open_blob(&key, &blob, b"FVLT\x01").unwrap(), b"payload");
        assert!(matches!(
            open_blob(&key, &blob, b"FVLT\x02"),
            Err(FolderVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let key = [0x22u8; 32];
        assert!(open_blob(&key, &[0u8; NONCE_LEN + TAG_LEN - 1], b"").is_err());
    }
}
