//! Password hashing and password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Parameters are configurable via `Argon2Params`
//! (loaded from `config.toml` or sensible defaults) and are stored next
//! to every hash so verification always replays the exact same cost.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::errors::{FolderVaultError, Result};

/// Length of a password salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived hash / key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// The cheapest parameters the crate accepts.  Only meant for tests.
    pub fn minimum() -> Self {
        Self {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// A derived password hash plus the salt that produced it, both hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash_hex: String,
    pub salt_hex: String,
}

/// Derive a 32-byte key with explicit Argon2id parameters.
///
/// The same password + salt + params will always produce the same key.
/// Enforces minimum Argon2 parameters to prevent dangerously weak KDF settings.
pub fn derive_key_with_params(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    if argon2_params.memory_kib < MIN_MEMORY_KIB {
        return Err(FolderVaultError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            argon2_params.memory_kib
        )));
    }
    if argon2_params.iterations < 1 {
        return Err(FolderVaultError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if argon2_params.parallelism < 1 {
        return Err(FolderVaultError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| FolderVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| {
            FolderVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

    Ok(key)
}

/// Hash a vault password.
///
/// With `salt_hex = None` a fresh random 16-byte salt is generated, so two
/// calls with the same password produce different salts and hashes.
/// Passing an existing salt reproduces the stored hash exactly.
pub fn hash_password(
    password: &[u8],
    salt_hex: Option<&str>,
    params: &Argon2Params,
) -> Result<PasswordHash> {
    let salt = match salt_hex {
        Some(hex_str) => hex::decode(hex_str).map_err(|e| {
            FolderVaultError::KeyDerivationFailed(format!("salt is not valid hex: {e}"))
        })?,
        None => generate_salt().to_vec(),
    };

    let mut digest = derive_key_with_params(password, &salt, params)?;
    let hash_hex = hex::encode(digest);
    digest.zeroize();

    Ok(PasswordHash {
        hash_hex,
        salt_hex: hex::encode(&salt),
    })
}

/// Recompute the hash for `password` and compare it to `expected_hex`
/// in constant time.
pub fn verify_password(
    password: &[u8],
    salt_hex: &str,
    expected_hex: &str,
    params: &Argon2Params,
) -> Result<bool> {
    let candidate = hash_password(password, Some(salt_hex), params)?;
    Ok(candidate
        .hash_hex
        .as_bytes()
        .ct_eq(expected_hex.as_bytes())
        .into())
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
