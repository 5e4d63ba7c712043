//! Integration tests for the FolderVault crypto module.

use foldervault::crypto::keys::{derive_content_key, derive_registry_key, MasterKey};
use foldervault::crypto::{
    hash_password, open_blob, seal_blob, verify_password, Argon2Params,
};
use foldervault::errors::FolderVaultError;

fn params() -> Argon2Params {
    Argon2Params::minimum()
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

#[test]
fn hash_is_deterministic_for_same_password_and_salt() {
    let first = hash_password(b"hunter2", None, &params()).expect("hash");
    let again = hash_password(b"hunter2", Some(&first.salt_hex), &params()).expect("rehash");

    assert_eq!(first.hash_hex, again.hash_hex);
    assert_eq!(first.salt_hex, again.salt_hex);
}

#[test]
fn omitted_salt_is_fresh_each_time() {
    let a = hash_password(b"hunter2", None, &params()).expect("hash a");
    let b = hash_password(b"hunter2", None, &params()).expect("hash b");

    assert_ne!(a.salt_hex, b.salt_hex);
    assert_ne!(a.hash_hex, b.hash_hex);
}

#[test]
fn hash_and_salt_are_hex_of_expected_length() {
    let h = hash_password(b"pw", None, &params()).expect("hash");
    assert_eq!(h.hash_hex.len(), 64);
    assert_eq!(h.salt_hex.len(), 32);
    assert!(h.hash_hex.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn verify_accepts_only_the_exact_password() {
    let h = hash_password(b"hunter2", None, &params()).expect("hash");

    assert!(verify_password(b"hunter2", &h.salt_hex, &h.hash_hex, &params()).unwrap());
    for wrong in ["hunter3", "Hunter2", "hunter", "hunter22", " hunter2", ""] {
        assert!(
            !verify_password(wrong.as_bytes(), &h.salt_hex, &h.hash_hex, &params()).unwrap(),
            "{wrong:?} must not verify"
        );
    }
}

#[test]
fn verify_fails_with_a_different_salt() {
    let h = hash_password(b"hunter2", None, &params()).expect("hash");
    let other = hash_password(b"hunter2", None, &params()).expect("other");

    assert!(!verify_password(b"hunter2", &other.salt_hex, &h.hash_hex, &params()).unwrap());
}

#[test]
fn verify_depends_on_kdf_params() {
    let h = hash_password(b"hunter2", None, &params()).expect("hash");
    let stronger = Argon2Params {
        iterations: 2,
        ..params()
    };
    assert!(!verify_password(b"hunter2", &h.salt_hex, &h.hash_hex, &stronger).unwrap());
}

#[test]
fn malformed_salt_is_an_error() {
    let err = hash_password(b"pw", Some("not hex"), &params()).unwrap_err();
    assert!(matches!(err, FolderVaultError::KeyDerivationFailed(_)));
}

// ---------------------------------------------------------------------------
// Sub-keys
// ---------------------------------------------------------------------------

#[test]
fn registry_and_content_keys_are_independent() {
    let master = [0x07u8; 32];
    let registry = derive_registry_key(&master).expect("registry key");
    let content = derive_content_key(&master).expect("content key");

    assert_ne!(*registry, *content);
    assert_ne!(*registry, master);
    assert_eq!(*registry, *derive_registry_key(&master).unwrap());
}

#[test]
fn master_key_wrapper_matches_free_functions() {
    let raw = [0x33u8; 32];
    let master = MasterKey::new(raw);

    assert_eq!(*master.registry_key().unwrap(), *derive_registry_key(&raw).unwrap());
    assert_eq!(*master.content_key().unwrap(), *derive_content_key(&raw).unwrap());
}

#[test]
fn generated_master_keys_differ() {
    assert_ne!(
        MasterKey::generate().as_bytes(),
        MasterKey::generate().as_bytes()
    );
}

// ---------------------------------------------------------------------------
// AEAD blobs
// ---------------------------------------------------------------------------

#[test]
fn sealed_blob_is_bound_to_key_and_aad() {
    let key = [0xABu8; 32];
    let blob = seal_blob(&key, b"archive bytes", b"FVLT\x01").expect("seal");

    assert_eq!(open_blob(&key, &blob, b"FVLT\x01").unwrap(), b"archive bytes");
    assert!(open_blob(&[0u8; 32], &blob, b"FVLT\x01").is_err());
    assert!(open_blob(&key, &blob, b"FVRG\x01").is_err());
}

#[test]
fn sealing_twice_uses_fresh_nonces() {
    let key = [0xCDu8; 32];
    let a = seal_blob(&key, b"same", b"").unwrap();
    let b = seal_blob(&key, b"same", b"").unwrap();

    assert_ne!(a[..12], b[..12], "nonces must never repeat");
    assert_ne!(a, b);
}

#[test]
fn tampered_blob_is_rejected() {
    let key = [0x11u8; 32];
    let mut blob = seal_blob(&key, b"payload", b"").unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x01;

    assert!(matches!(
        open_blob(&key, &blob, b""),
        Err(FolderVaultError::DecryptionFailed)
    ));
}
