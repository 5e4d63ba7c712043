//! Folder sealing: pack a directory tree into an encrypted container
//! and restore it again.
//!
//! Ordering guarantees:
//! - `seal` refuses trees holding symlinks or special files, and removes
//!   the plaintext tree only after the container has been written,
//!   fsynced, renamed into place, and read back byte-for-byte.
//! - `unseal` decrypts and validates everything before writing a single
//!   file, extracts into a hidden staging directory, renames it into
//!   place, and only then deletes the container.
//!
//! A crash between "container durable" and "plaintext removed" (or the
//! mirror window during unseal) can leave both copies on disk.  That
//! window is not recovered automatically; the engine detects the unseal
//! side of it on the next open.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::format;
use crate::errors::{FolderVaultError, Result};
use crate::platform;

/// What `seal` wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealReport {
    pub files: usize,
    pub directories: usize,
    pub container_bytes: u64,
}

/// What `unseal` restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsealReport {
    pub entries: usize,
    /// The container could not be deleted after a successful restore.
    pub leftover_container: bool,
}

/// Container file name for a cover name.
pub fn container_file_name(cover_name: &str, extension: &str) -> String {
    format!("{cover_name}.{extension}")
}

// ---------------------------------------------------------------------------
// Seal
// ---------------------------------------------------------------------------

/// Pack `source_dir` and encrypt it under `key`, returning container bytes.
pub fn pack_and_encrypt(source_dir: &Path, key: &[u8]) -> Result<(Vec<u8>, SealReport)> {
    let (archive, mut report) = pack_directory(source_dir)?;
    let container = format::encode_container(&archive, key)?;
    report.container_bytes = container.len() as u64;
    Ok((container, report))
}

/// Replace `source_dir` with an encrypted container at `container_path`.
///
/// On error before the plaintext is touched, nothing changes on disk.
/// If the container is durable but the tree cannot be fully removed,
/// `PartialSeal` is returned and the container is kept.
pub fn seal(source_dir: &Path, container_path: &Path, key: &[u8]) -> Result<SealReport> {
    if !source_dir.is_dir() {
        return Err(FolderVaultError::NotFound(format!(
            "{} is not a directory",
            source_dir.display()
        )));
    }
    if fs::symlink_metadata(container_path).is_ok() {
        return Err(FolderVaultError::NameCollision(container_path.to_path_buf()));
    }

    let (container, report) = pack_and_encrypt(source_dir, key)?;

    platform::write_atomic(container_path, &container)?;
    if let Err(e) = confirm_written(container_path, &container) {
        let _ = fs::remove_file(container_path);
        return Err(e);
    }

    tracing::debug!(
        container = %container_path.display(),
        files = report.files,
        bytes = report.container_bytes,
        "container durable; removing plaintext"
    );

    if let Err(source) = fs::remove_dir_all(source_dir) {
        tracing::error!(
            source_dir = %source_dir.display(),
            error = %source,
            "plaintext removal failed after sealing; both copies present"
        );
        return Err(FolderVaultError::PartialSeal {
            container: container_path.to_path_buf(),
            source,
        });
    }
    if let Some(parent) = source_dir.parent() {
        platform::sync_dir(parent)?;
    }

    Ok(report)
}

/// Re-read the container and compare it with what we meant to write.
fn confirm_written(path: &Path, expected: &[u8]) -> Result<()> {
    let on_disk = fs::read(path)?;
    if on_disk != expected {
        return Err(FolderVaultError::Io(io::Error::other(format!(
            "container at {} does not match the bytes written",
            path.display()
        ))));
    }
    Ok(())
}

/// Build a deflate zip of every directory and regular file below `root`.
///
/// Entry names are `/`-separated paths relative to `root`.  A symlink or
/// special file anywhere in the tree fails the whole seal with
/// `InvalidInput`: it could not be restored, and removing the tree would
/// lose it.
fn pack_directory(root: &Path) -> Result<(Vec<u8>, SealReport)> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut report = SealReport {
        files: 0,
        directories: 0,
        container_bytes: 0,
    };

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry.map_err(|e| {
            FolderVaultError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed")),
            )
        })?;
        let name = entry_name(root, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            writer.add_directory(name, deflate()).map_err(zip_write_error)?;
            report.directories += 1;
        } else if file_type.is_file() {
            let options = with_mode(deflate(), entry.path())?;
            writer.start_file(name, options).map_err(zip_write_error)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut writer)?;
            report.files += 1;
        } else {
            let kind = if file_type.is_symlink() {
                "a symbolic link"
            } else {
                "not a regular file or folder"
            };
            return Err(FolderVaultError::InvalidInput(format!(
                "{} is {kind} and cannot be sealed; move it out of the folder first",
                entry.path().display()
            )));
        }
    }

    let cursor = writer.finish().map_err(zip_write_error)?;
    Ok((cursor.into_inner(), report))
}

fn deflate() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Relative, `/`-joined entry name.  Non-UTF-8 names are refused rather
/// than silently mangled.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| FolderVaultError::Io(io::Error::other("walk escaped the source folder")))?;

    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            FolderVaultError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file name is not valid UTF-8: {}", path.display()),
            ))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn with_mode(options: SimpleFileOptions, path: &Path) -> Result<SimpleFileOptions> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    Ok(options.unix_permissions(mode & 0o777))
}

#[cfg(not(unix))]
fn with_mode(options: SimpleFileOptions, _path: &Path) -> Result<SimpleFileOptions> {
    Ok(options)
}

fn zip_write_error(e: zip::result::ZipError) -> FolderVaultError {
    FolderVaultError::Io(io::Error::other(format!("zip: {e}")))
}

// ---------------------------------------------------------------------------
// Unseal
// ---------------------------------------------------------------------------

/// Restore `container_path` into `dest_dir` and delete the container.
///
/// `dest_dir` must not exist.  Any failure before the final rename leaves
/// the container untouched and `dest_dir` absent.
pub fn unseal(container_path: &Path, key: &[u8], dest_dir: &Path) -> Result<UnsealReport> {
    let entries = extract(container_path, key, dest_dir)?;

    let leftover_container = match fs::remove_file(container_path) {
        Ok(()) => {
            if let Some(parent) = container_path.parent() {
                platform::sync_dir(parent)?;
            }
            false
        }
        Err(e) => {
            tracing::warn!(
                container = %container_path.display(),
                error = %e,
                "folder restored but the container could not be deleted"
            );
            true
        }
    };

    Ok(UnsealReport {
        entries,
        leftover_container,
    })
}

/// Decrypt `container_path` into a new `dest_dir`, keeping the container.
///
/// Returns the number of entries written.
pub fn extract(container_path: &Path, key: &[u8], dest_dir: &Path) -> Result<usize> {
    if fs::symlink_metadata(dest_dir).is_ok() {
        return Err(FolderVaultError::NameCollision(dest_dir.to_path_buf()));
    }

    let data = fs::read(container_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FolderVaultError::NotFound(format!(
            "container {} is missing",
            container_path.display()
        )),
        _ => FolderVaultError::Io(e),
    })?;
    let archive = format::decode_container(&data, key)?;

    let staging = platform::temp_sibling(dest_dir, "unsealing");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let written = match unpack_into(&archive, &staging) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&staging, dest_dir) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e.into());
    }
    if let Some(parent) = dest_dir.parent() {
        platform::sync_dir(parent)?;
    }

    Ok(written)
}

/// Validate every entry name, then write the tree below `dest`.
fn unpack_into(archive_bytes: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| FolderVaultError::CorruptArchive(format!("zip: {e}")))?;

    // First pass: reject the whole archive if any entry escapes `dest`.
    let mut plan = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| FolderVaultError::CorruptArchive(format!("zip entry {i}: {e}")))?;
        plan.push((entry_path(entry.name())?, entry.is_dir()));
    }

    for (i, (rel, is_dir)) in plan.iter().enumerate() {
        let target = dest.join(rel);
        if *is_dir {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FolderVaultError::CorruptArchive(format!("zip entry {i}: {e}")))?;
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| FolderVaultError::CorruptArchive(format!("{}: {e}", rel.display())))?;
        out.flush()?;
        out.sync_all()?;
        apply_mode(&target, entry.unix_mode())?;
    }

    Ok(plan.len())
}

/// Turn a zip entry name into a relative path that stays inside the
/// destination, or refuse it.
pub fn entry_path(name: &str) -> Result<PathBuf> {
    let escape = || FolderVaultError::CorruptArchive(format!("entry '{name}' escapes the destination"));

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(escape());
    }

    let mut rel = PathBuf::new();
    for part in name.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(escape()),
            p if cfg!(windows) && (p.contains('\\') || p.contains(':')) => return Err(escape()),
            p if p.contains('\0') => return Err(escape()),
            p => rel.push(p),
        }
    }

    if rel.as_os_str().is_empty() {
        return Err(FolderVaultError::CorruptArchive(format!(
            "entry '{name}' has an empty path"
        )));
    }
    Ok(rel)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_accepts_nested_names() {
        assert_eq!(
            entry_path("docs/2024/report.txt").unwrap(),
            PathBuf::from("docs").join("2024").join("report.txt")
        );
        assert_eq!(entry_path("empty/").unwrap(), PathBuf::from("empty"));
    }

    #[test]
    fn entry_path_rejects_traversal() {
        assert!(entry_path("../evil").is_err());
        assert!(entry_path("a/../../evil").is_err());
        assert!(entry_path("/etc/passwd").is_err());
        assert!(entry_path("\\windows\\system32").is_err());
        assert!(entry_path("").is_err());
        assert!(entry_path("./").is_err());
    }

    #[test]
    fn container_name_uses_extension() {
        assert_eq!(container_file_name("holiday", "fvault"), "holiday.fvault");
    }
}
