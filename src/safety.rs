use crate::error::PatchError;
use crate::target::HostApp;
use std::path::{Path, PathBuf};

/// Confines writes to a verified install root.
///
/// Targets are resolved through symlinks before every write so a link inside
/// the install tree cannot redirect a patch outside of it.
#[derive(Debug, Clone)]
pub struct InstallGuard {
    /// Canonical install root
    root: PathBuf,
}

impl InstallGuard {
    /// Canonicalize `root`, failing with a path error if it does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PatchError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| PatchError::path(root, format!("cannot resolve install path: {e}")))?;
        if !canonical.is_dir() {
            return Err(PatchError::path(root, "install path is not a directory"));
        }
        Ok(Self { root: canonical })
    }

    /// Guard for `root` after checking it looks like an install of `host`.
    pub fn for_host(host: HostApp, root: impl AsRef<Path>) -> Result<Self, PatchError> {
        let guard = Self::new(root)?;
        if !host.is_valid_root(&guard.root) {
            return Err(PatchError::path(
                &guard.root,
                format!(
                    "not a {} install (missing {})",
                    host.label(),
                    host.root_marker().display()
                ),
            ));
        }
        Ok(guard)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical form of `path` if it exists inside the install root.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, PatchError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = absolute
            .canonicalize()
            .map_err(|e| PatchError::path(&absolute, e.to_string()))?;

        if !canonical.starts_with(&self.root) {
            return Err(PatchError::path(
                &canonical,
                format!("outside install root {}", self.root.display()),
            ));
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_root_is_path_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = InstallGuard::new(temp_dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PatchError::Path { .. }));
    }

    #[test]
    fn test_for_host_requires_marker() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = InstallGuard::for_host(HostApp::Antigravity, temp_dir.path()).unwrap_err();
        assert!(matches!(err, PatchError::Path { .. }));

        fs::create_dir_all(temp_dir.path().join("resources/app")).unwrap();
        assert!(InstallGuard::for_host(HostApp::Antigravity, temp_dir.path()).is_ok());
    }

    #[test]
    fn test_validate_path_inside_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("resources/app/out/main.js");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();
        let guard = InstallGuard::new(temp_dir.path()).unwrap();

        assert!(guard.validate_path(&file).is_ok());
        assert!(guard.validate_path("resources/app/out/main.js").is_ok());
    }

    #[test]
    fn test_validate_path_outside_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("install");
        fs::create_dir_all(&root).unwrap();
        let outside = temp_dir.path().join("outside.js");
        fs::write(&outside, b"").unwrap();
        let guard = InstallGuard::new(&root).unwrap();

        assert!(matches!(
            guard.validate_path(&outside),
            Err(PatchError::Path { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("install");
        fs::create_dir_all(&root).unwrap();
        let outside = temp_dir.path().join("outside.js");
        fs::write(&outside, b"").unwrap();
        let link = root.join("escape.js");
        symlink(&outside, &link).unwrap();

        let guard = InstallGuard::new(&root).unwrap();

        assert!(matches!(
            guard.validate_path(&link),
            Err(PatchError::Path { .. })
        ));
    }
}
