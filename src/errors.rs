use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in FolderVault.
#[derive(Debug, Error)]
pub enum FolderVaultError {
    // --- Vault lifecycle errors ---
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Folder is already sealed: {0}")]
    AlreadyManaged(PathBuf),

    #[error("Cover name is already taken: {0}")]
    NameCollision(PathBuf),

    #[error("Too many wrong attempts — locked for {remaining_secs} more second(s)")]
    LockedOut { remaining_secs: u64 },

    #[error("Invalid password — {tries_left} tries left")]
    InvalidCredentials { tries_left: u32 },

    // --- Key management errors ---
    #[error("Master key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Container errors ---
    #[error("Corrupt container: {0}")]
    CorruptArchive(String),

    #[error(
        "Container written to {} but the original folder could not be fully removed: {source}",
        container.display()
    )]
    PartialSeal {
        container: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- Input errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid cover name: {0}")]
    InvalidCoverName(String),

    #[error("Invalid lockout policy: {0}")]
    InvalidPolicy(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Coarse classification of a [`FolderVaultError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyManaged,
    NameCollision,
    LockedOut,
    InvalidCredentials,
    KeyUnavailable,
    CorruptArchive,
    IoFailure,
    InvalidInput,
}

impl FolderVaultError {
    /// Map this error onto the taxonomy callers branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyManaged(_) => ErrorKind::AlreadyManaged,
            Self::NameCollision(_) => ErrorKind::NameCollision,
            Self::LockedOut { .. } => ErrorKind::LockedOut,
            Self::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
            Self::KeyUnavailable(_) | Self::KeyringError(_) => ErrorKind::KeyUnavailable,
            Self::DecryptionFailed | Self::CorruptArchive(_) => ErrorKind::CorruptArchive,
            Self::EncryptionFailed(_)
            | Self::KeyDerivationFailed(_)
            | Self::PartialSeal { .. }
            | Self::Io(_)
            | Self::SerializationError(_)
            | Self::AuditError(_) => ErrorKind::IoFailure,
            Self::InvalidInput(_)
            | Self::InvalidCoverName(_)
            | Self::InvalidPolicy(_)
            | Self::ConfigError(_)
            | Self::CommandFailed(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Convenience type alias for FolderVault results.
pub type Result<T> = std::result::Result<T, FolderVaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_errors_carry_their_payload() {
        let err = FolderVaultError::LockedOut { remaining_secs: 4 };
        assert_eq!(err.kind(), ErrorKind::LockedOut);
        assert!(err.to_string().contains("4 more second"));

        let err = FolderVaultError::InvalidCredentials { tries_left: 2 };
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
        assert!(err.to_string().contains("2 tries left"));
    }

    #[test]
    fn io_errors_classify_as_io_failure() {
        let err: FolderVaultError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn engine_input_errors_classify_as_invalid_input() {
        let err = FolderVaultError::InvalidInput("password cannot be empty".into());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().starts_with("Invalid input"));
    }

    #[test]
    fn decryption_failure_is_a_corrupt_archive() {
        assert_eq!(
            FolderVaultError::DecryptionFailed.kind(),
            ErrorKind::CorruptArchive
        );
    }
}
