//! Filesystem-only discovery of host installations.
//!
//! Checks the usual per-user and system install locations; nothing here
//! queries the Windows registry.

use crate::target::HostApp;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

const CONTINUE_DIR_PREFIX: &str = "continue.continue-";

/// Candidate Antigravity install roots, most likely first.
pub fn antigravity_candidates(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = home {
        candidates.push(home.join("AppData/Local/Programs/Antigravity"));
        candidates.push(home.join("AppData/Local/Antigravity"));
    }
    candidates.extend(
        [
            "C:\\Program Files\\Antigravity",
            "C:\\Program Files (x86)\\Antigravity",
            "D:\\Antigravity",
            "D:\\Program Files\\Antigravity",
            "E:\\Antigravity",
            "/opt/Antigravity",
            "/usr/share/antigravity",
        ]
        .into_iter()
        .map(PathBuf::from),
    );
    candidates
}

/// First candidate that is a valid Antigravity install.
pub fn find_antigravity_install() -> Option<PathBuf> {
    let home = home::home_dir();
    antigravity_candidates(home.as_deref())
        .into_iter()
        .find(|p| HostApp::Antigravity.is_valid_root(p))
}

/// `~/.antigravity/extensions`.
pub fn default_extensions_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".antigravity").join("extensions"))
}

/// Version embedded in a `continue.continue-<version>-<platform>` name.
fn extension_version(dir_name: &str) -> Option<Version> {
    let rest = dir_name.strip_prefix(CONTINUE_DIR_PREFIX)?;
    let version = rest.split('-').next()?;
    Version::parse(version).ok()
}

/// Newest Continue extension directory under `extensions_dir`.
///
/// Ordered by the embedded version when it parses, by name otherwise.
/// Returns the extension root only if its GUI bundle is present.
pub fn find_continue_extension(extensions_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(extensions_dir).ok()?;

    let newest = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            name.starts_with(CONTINUE_DIR_PREFIX)
                .then(|| (extension_version(&name), name, e.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))?;

    let root = newest.2;
    if HostApp::Continue.is_valid_root(&root) {
        Some(root)
    } else {
        tracing::debug!(dir = %root.display(), "newest Continue extension has no GUI bundle");
        None
    }
}
