//! Drop integrity checksums for patched bundles from `product.json`.
//!
//! The host verifies bundle checksums listed in `product.json` and reports a
//! corrupt installation when they no longer match. Removing the entries for
//! the files we rewrite silences that check. This is a line-based edit, not
//! a JSON rewrite: the file layout is otherwise left untouched.

use crate::error::PatchError;
use crate::fsio;
use std::path::{Path, PathBuf};

/// Checksum keys of the bundles the Antigravity targets rewrite.
pub const CHECKSUM_KEYS: [&str; 2] = [
    "\"jetskiAgent/main.js\"",
    "\"vs/workbench/workbench.desktop.main.js\"",
];

pub fn product_json_path(install_root: &Path) -> PathBuf {
    install_root.join("resources").join("app").join("product.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// Number of checksum lines removed
    Removed(usize),
    AlreadyStripped,
}

/// Remove every line mentioning one of `keys`, then drop trailing commas
/// left dangling before a closing brace or bracket.
pub fn strip_checksum_lines(content: &str, keys: &[&str]) -> (String, usize) {
    let mut kept: Vec<String> = Vec::new();
    let mut removed = 0;
    for line in content.split('\n') {
        if keys.iter().any(|key| line.contains(key)) {
            removed += 1;
        } else {
            kept.push(line.to_string());
        }
    }

    if removed == 0 {
        return (content.to_string(), 0);
    }

    for i in 0..kept.len() {
        let closes = kept[i + 1..]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .is_some_and(|l| l.starts_with('}') || l.starts_with(']'));
        if !closes {
            continue;
        }
        let trimmed_len = kept[i].trim_end().len();
        if kept[i][..trimmed_len].ends_with(',') {
            kept[i].remove(trimmed_len - 1);
        }
    }

    (kept.join("\n"), removed)
}

/// Strip [`CHECKSUM_KEYS`] from the `product.json` at `path` in place.
pub fn strip_product_checksums(path: &Path) -> Result<ChecksumOutcome, PatchError> {
    if !path.is_file() {
        return Err(PatchError::path(path, "product.json not found"));
    }
    let content = fsio::read_text(path).map_err(|e| PatchError::io(path, e))?;
    let (stripped, removed) = strip_checksum_lines(&content, &CHECKSUM_KEYS);
    if removed == 0 {
        return Ok(ChecksumOutcome::AlreadyStripped);
    }
    fsio::atomic_write(path, stripped.as_bytes()).map_err(|e| PatchError::io(path, e))?;
    tracing::info!(path = %path.display(), removed, "removed bundle checksums");
    Ok(ChecksumOutcome::Removed(removed))
}
