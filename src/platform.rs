//! Filesystem hardening helpers and best-effort capability hooks.
//!
//! `write_atomic` and `restrict_file` are load-bearing: the registry and
//! key artifacts depend on them.  The `AccessGuard` hooks are not: the
//! engine logs their failures and carries on.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `bytes` to `path` **atomically** and durably.
///
/// 1. Write to a temp file in the same directory.
/// 2. `fsync` the temp file.
/// 3. Rename it over the target path.
/// 4. `fsync` the parent directory (Unix) so the rename itself survives.
///
/// Readers never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = temp_sibling(path, "tmp");

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)?;
        sync_dir(parent)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// `.name.<suffix>` next to `path`.
pub fn temp_sibling(path: &Path, suffix: &str) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.{suffix}",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Flush directory metadata so renames and removals are durable.
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Restrict a data file to the current user (owner read/write only).
#[cfg(unix)]
pub fn restrict_file(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub fn restrict_file(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Hardening hooks applied to sealed artifacts.
///
/// None of these are required for correctness.
pub trait AccessGuard: Send + Sync {
    /// Keep the path out of casual directory listings.
    fn hide_from_browsing(&self, path: &Path) -> io::Result<()>;
    /// Deny access to everyone but the owner (or to everyone, for folders).
    fn restrict_access(&self, path: &Path) -> io::Result<()>;
    /// Undo `restrict_access` so the owner can use the path normally.
    fn restore_access(&self, path: &Path) -> io::Result<()>;
}

/// Native permission handling for the current platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeGuard;

#[cfg(unix)]
impl AccessGuard for NativeGuard {
    fn hide_from_browsing(&self, path: &Path) -> io::Result<()> {
        // Unix has no hidden attribute; hiding would mean renaming.
        tracing::debug!(path = %path.display(), "hide_from_browsing is a no-op on Unix");
        Ok(())
    }

    fn restrict_access(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mode = if fs::symlink_metadata(path)?.is_dir() {
            0o000
        } else {
            0o600
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    fn restore_access(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mode = if fs::symlink_metadata(path)?.is_dir() {
            0o700
        } else {
            0o600
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }
}

#[cfg(not(unix))]
impl AccessGuard for NativeGuard {
    fn hide_from_browsing(&self, path: &Path) -> io::Result<()> {
        tracing::debug!(path = %path.display(), "hide_from_browsing not supported here");
        Ok(())
    }

    fn restrict_access(&self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_file() {
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_readonly(true);
            fs::set_permissions(path, perms)?;
        }
        Ok(())
    }

    fn restore_access(&self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_file() {
            let mut perms = fs::metadata(path)?.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
        }
        Ok(())
    }
}

/// Hooks that do nothing, for tests and embedders with their own policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGuard;

impl AccessGuard for NoopGuard {
    fn hide_from_browsing(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn restrict_access(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn restore_access(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}
