//! One module per subcommand.

pub mod audit_cmd;
pub mod completions;
pub mod list;
pub mod lock;
pub mod passwd;
pub mod peek;
pub mod status;
pub mod unlock;

use std::path::Path;

use crate::audit::log_audit;
use crate::errors::FolderVaultError;

/// Record a rejected password check in the audit log.
///
/// Other failures are not credential events and are left out.
pub(crate) fn audit_rejection(data_dir: &Path, path: &Path, err: &FolderVaultError) {
    match err {
        FolderVaultError::InvalidCredentials { tries_left } => log_audit(
            data_dir,
            "unlock-failed",
            Some(path),
            Some(&format!("{tries_left} tries left")),
        ),
        FolderVaultError::LockedOut { remaining_secs } => log_audit(
            data_dir,
            "lockout",
            Some(path),
            Some(&format!("{remaining_secs}s remaining")),
        ),
        _ => {}
    }
}
