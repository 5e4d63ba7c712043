//! Binary artifact formats.
//!
//! Both the registry and sealed containers share one envelope:
//!
//! ```text
//! [magic: 4 bytes][version: 1 byte][12-byte nonce | AES-256-GCM ciphertext + tag]
//! ```
//!
//! - **Magic**: `FVRG` for the registry, `FVLT` for containers.
//! - **Version**: format version (currently `1`).
//! - The 5-byte prefix is authenticated as associated data, so a
//!   registry blob can never be passed off as a container or vice versa.
//!
//! The registry plaintext is a JSON `RegistryDocument`; the container
//! plaintext is a deflate-compressed zip archive.

use serde::{Deserialize, Serialize};

use super::record::{Registry, VaultRecord};
use crate::crypto::{open_blob, seal_blob};
use crate::errors::{FolderVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of the registry artifact.
const REGISTRY_MAGIC: &[u8; 4] = b"FVRG";

/// Magic bytes at the start of every container.
const CONTAINER_MAGIC: &[u8; 4] = b"FVLT";

/// Current binary envelope version.
pub const CURRENT_VERSION: u8 = 1;

/// Current registry document schema.
pub const REGISTRY_SCHEMA: u32 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version).
const PREFIX_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Plaintext form of the registry artifact.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    format: u32,
    vaults: Vec<VaultRecord>,
}

/// Serialize and encrypt a registry.
///
/// Records are written in `original_path` order so identical registries
/// produce identical plaintext.
pub fn encode_registry(registry: &Registry, key: &[u8]) -> Result<Vec<u8>> {
    let doc = RegistryDocument {
        format: REGISTRY_SCHEMA,
        vaults: registry.records().cloned().collect(),
    };
    let json = serde_json::to_vec(&doc)
        .map_err(|e| FolderVaultError::SerializationError(format!("registry: {e}")))?;

    seal_envelope(REGISTRY_MAGIC, key, &json)
}

/// Decrypt and parse a registry artifact.
pub fn decode_registry(data: &[u8], key: &[u8]) -> Result<Registry> {
    let json = open_envelope(REGISTRY_MAGIC, key, data).map_err(|e| match e {
        FolderVaultError::DecryptionFailed => FolderVaultError::CorruptArchive(
            "registry authentication failed — wrong key or tampered file".into(),
        ),
        other => other,
    })?;

    let doc: RegistryDocument = serde_json::from_slice(&json)
        .map_err(|e| FolderVaultError::SerializationError(format!("registry JSON: {e}")))?;

    if doc.format > REGISTRY_SCHEMA {
        return Err(FolderVaultError::SerializationError(format!(
            "registry schema {} is newer than supported ({REGISTRY_SCHEMA})",
            doc.format
        )));
    }

    Ok(doc.vaults.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Encrypt a packed archive into container bytes.
pub fn encode_container(archive: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    seal_envelope(CONTAINER_MAGIC, key, archive)
}

/// Decrypt container bytes back into the packed archive.
///
/// Authentication failure (wrong key, tampering) aborts with
/// `CorruptArchive`; nothing is returned partially.
pub fn decode_container(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    open_envelope(CONTAINER_MAGIC, key, data).map_err(|e| match e {
        FolderVaultError::DecryptionFailed => FolderVaultError::CorruptArchive(
            "container authentication failed — wrong key or tampered file".into(),
        ),
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

fn seal_envelope(magic: &[u8; 4], key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let prefix = prefix(magic);
    let sealed = seal_blob(key, plaintext, &prefix)?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + sealed.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(&sealed);
    Ok(buf)
}

fn open_envelope(magic: &[u8; 4], key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < PREFIX_LEN {
        return Err(FolderVaultError::CorruptArchive(
            "file too small to be a FolderVault artifact".into(),
        ));
    }

    if &data[0..4] != magic {
        return Err(FolderVaultError::CorruptArchive(format!(
            "missing {} magic bytes",
            String::from_utf8_lossy(magic)
        )));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(FolderVaultError::CorruptArchive(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    open_blob(key, &data[PREFIX_LEN..], &data[..PREFIX_LEN])
}

fn prefix(magic: &[u8; 4]) -> [u8; PREFIX_LEN] {
    let mut prefix = [0u8; PREFIX_LEN];
    prefix[..4].copy_from_slice(magic);
    prefix[4] = CURRENT_VERSION;
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x5Au8; 32];

    #[test]
    fn container_roundtrip() {
        let blob = encode_container(b"zip bytes", &KEY).unwrap();
        assert_eq!(&blob[0..4], CONTAINER_MAGIC);
        assert_eq!(decode_container(&blob, &KEY).unwrap(), b"zip bytes");
    }

    #[test]
    fn container_with_wrong_key_is_corrupt() {
        let blob = encode_container(b"zip bytes", &KEY).unwrap();
        let err = decode_container(&blob, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, FolderVaultError::CorruptArchive(_)));
    }

    #[test]
    fn registry_blob_is_not_a_container() {
        let blob = encode_registry(&Registry::new(), &KEY).unwrap();
        assert!(decode_container(&blob, &KEY).is_err());
    }

    #[test]
    fn version_byte_is_authenticated() {
        let mut blob = encode_container(b"zip bytes", &KEY).unwrap();
        blob[4] = 2;
        assert!(decode_container(&blob, &KEY).is_err());
    }

    #[test]
    fn tiny_input_is_rejected() {
        assert!(decode_registry(b"FV", &KEY).is_err());
    }

    #[test]
    fn empty_registry_roundtrip() {
        let blob = encode_registry(&Registry::new(), &KEY).unwrap();
        assert!(decode_registry(&blob, &KEY).unwrap().is_empty());
    }
}
