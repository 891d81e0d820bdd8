//! Enumerate persisted backup units and copy their files back into place.

use crate::backup::{BackupStore, BackupUnit, Manifest, MANIFEST_FILE_NAME};
use crate::error::PatchError;
use crate::fsio;
use crate::report::{BatchReport, FileAction, FileOutcome};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RestoreEngine {
    root: PathBuf,
}

impl RestoreEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_store(store: &BackupStore) -> Self {
        Self::new(store.root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every restorable unit, most recent first.
    ///
    /// Directories without a readable, well-formed manifest are skipped. A
    /// missing backup root yields an empty list.
    pub fn list_units(&self) -> Result<Vec<BackupUnit>, PatchError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PatchError::io(&self.root, e)),
        };

        let paths = entries.map(|entry| entry.map(|e| e.path()));
        Ok(collect_units(&self.root, paths))
    }

    /// Unit whose directory name is exactly `name`.
    ///
    /// `name` must be a single directory name under the backup root.
    pub fn find_unit(&self, name: &str) -> Result<BackupUnit, PatchError> {
        let mut parts = Path::new(name).components();
        if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
            return Err(PatchError::path(name, "not a backup unit name"));
        }
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(PatchError::path(dir, "no such backup unit"));
        }
        load_unit(&dir)
    }

    pub fn latest(&self) -> Result<Option<BackupUnit>, PatchError> {
        Ok(self.list_units()?.into_iter().next())
    }

    /// Copy every recorded file back to its original path.
    ///
    /// Not transactional: a failure on one file leaves already restored
    /// files in place and the remaining files are still attempted.
    pub fn restore_unit(&self, unit: &BackupUnit) -> BatchReport {
        let mut report = BatchReport::default();

        for (original, backup_name) in unit.files() {
            let result = restore_file(&unit.backup_path(backup_name), original);
            match &result {
                Ok(_) => tracing::info!(path = %original.display(), "restored file"),
                Err(e) => tracing::warn!(path = %original.display(), error = %e, "restore failed"),
            }
            report.push(FileOutcome {
                path: original.clone(),
                description: backup_name.clone(),
                result,
            });
        }

        report
    }
}

/// Load every unit directory among `entries`, newest first.
///
/// Unreadable entries, stray files and directories without a valid manifest
/// are skipped with a warning.
fn collect_units(
    root: &Path,
    entries: impl Iterator<Item = io::Result<PathBuf>>,
) -> Vec<BackupUnit> {
    let mut units = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        match load_unit(&path) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "skipping backup directory");
            }
        }
    }

    // Names start with a sortable timestamp
    units.sort_by(|a, b| b.name().cmp(a.name()));
    units
}

/// Read the manifest inside `dir`.
pub fn load_unit(dir: &Path) -> Result<BackupUnit, PatchError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PatchError::NotFound { path });
        }
        Err(e) => return Err(PatchError::io(&path, e)),
    };
    let manifest =
        Manifest::from_json(&json).map_err(|source| PatchError::Serialization { path, source })?;
    Ok(BackupUnit::from_parts(dir.to_path_buf(), manifest))
}

fn restore_file(backup: &Path, original: &Path) -> Result<FileAction, PatchError> {
    if !backup.is_file() {
        return Err(PatchError::NotFound {
            path: backup.to_path_buf(),
        });
    }
    let content = fs::read(backup).map_err(|e| PatchError::io(backup, e))?;
    fsio::atomic_write(original, &content).map_err(|e| PatchError::io(original, e))?;
    Ok(FileAction::Restored {
        bytes: content.len(),
    })
}
