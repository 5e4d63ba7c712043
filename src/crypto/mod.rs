//! Cryptographic primitives for FolderVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password hashing and key derivation (`kdf`)
//! - The master key type and HKDF sub-key derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal_blob, open_blob, hash_password, ...};
pub use encryption::{open_blob, seal_blob};
pub use kdf::{
    derive_key_with_params, generate_salt, hash_password, verify_password, Argon2Params,
    PasswordHash,
};
pub use keys::{derive_content_key, derive_registry_key, MasterKey};
