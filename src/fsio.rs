//! Crash-safe file replacement.
//!
//! Host assets and backup manifests are replaced with tempfile + fsync +
//! rename, so a reader either sees the old bytes or the new bytes and never
//! a truncated file.

use filetime::FileTime;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Atomically replace `path` with `content`.
///
/// An existing file keeps its permissions; a new file gets the temp file's
/// default mode. Existing files marked read-only are refused with
/// [`io::ErrorKind::PermissionDenied`]: a rename would otherwise silently
/// replace them even though an in-place write is not permitted.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let existing = fs::metadata(path).ok();
    if let Some(meta) = &existing {
        if meta.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
    }

    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory")
    })?;

    // Same directory keeps the rename on one filesystem
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(meta) = &existing {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Copy the modification time of `source_meta` onto `dest`.
pub fn copy_mtime(source_meta: &fs::Metadata, dest: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(source_meta);
    filetime::set_file_mtime(dest, mtime)
}

/// Read a file that is expected to hold UTF-8 text.
pub fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
