//! Backup units: timestamped snapshots of original files plus a manifest.
//!
//! Layout under the backup root:
//!
//! ```text
//! <root>/<YYYY-MM-DD_HH-MM-SS>_<kind>/
//!     main.js
//!     chat.js
//!     backup_record.json
//! ```
//!
//! A unit is only visible to restore once its manifest exists. Directories
//! left behind without one (a crash between copy and persist) are ignored.

use crate::error::PatchError;
use crate::fsio;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Directory created next to the executable when no root is configured.
pub const BACKUP_DIR_NAME: &str = "antigravity_backup";
pub const MANIFEST_FILE_NAME: &str = "backup_record.json";

const DIR_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What kind of installation a unit was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupKind {
    #[serde(rename = "antigravity")]
    PrimaryApp,
    #[serde(rename = "continue")]
    Extension,
}

impl BackupKind {
    /// Tag used in directory names and the manifest.
    pub fn tag(&self) -> &'static str {
        match self {
            BackupKind::PrimaryApp => "antigravity",
            BackupKind::Extension => "continue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackupKind::PrimaryApp => "Antigravity",
            BackupKind::Extension => "Continue",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Persisted description of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub timestamp: String,
    pub install_path: PathBuf,
    pub backup_type: BackupKind,
    /// Original absolute path → backup file name inside the unit directory
    pub files: BTreeMap<PathBuf, String>,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// A unit that is still being filled. Not visible to restore.
#[derive(Debug)]
#[must_use = "a pending unit must be persisted to become restorable"]
pub struct PendingUnit {
    dir: PathBuf,
    manifest: Manifest,
}

impl PendingUnit {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn contains(&self, original: &Path) -> bool {
        self.manifest.files.contains_key(original)
    }

    /// Backup name for `original`, namespaced with a path hash when another
    /// original already claimed the plain base name.
    fn backup_name_for(&self, original: &Path) -> Result<String, PatchError> {
        let base = original
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PatchError::path(original, "path has no usable file name"))?;

        if let Some(existing) = self.manifest.files.get(original) {
            return Ok(existing.clone());
        }

        let taken = self.manifest.files.values().any(|name| name == base);
        if !taken {
            return Ok(base.to_string());
        }

        let hash = xxh3_64(original.to_string_lossy().as_bytes());
        Ok(format!("{hash:016x}_{base}"))
    }
}

/// A unit whose manifest has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupUnit {
    dir: PathBuf,
    manifest: Manifest,
}

impl BackupUnit {
    pub(crate) fn from_parts(dir: PathBuf, manifest: Manifest) -> Self {
        Self { dir, manifest }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory name, which sorts by creation time.
    pub fn name(&self) -> &str {
        self.dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn kind(&self) -> BackupKind {
        self.manifest.backup_type
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, String> {
        &self.manifest.files
    }

    pub fn backup_path(&self, backup_name: &str) -> PathBuf {
        self.dir.join(backup_name)
    }
}

/// Creates and fills backup units under a root directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<directory of the running executable>/antigravity_backup`.
    pub fn default_root() -> Result<PathBuf, PatchError> {
        let exe = std::env::current_exe().map_err(|e| PatchError::io("<current executable>", e))?;
        let dir = exe
            .parent()
            .ok_or_else(|| PatchError::path(&exe, "executable has no parent directory"))?;
        Ok(dir.join(BACKUP_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn open_unit(
        &self,
        kind: BackupKind,
        install_path: &Path,
    ) -> Result<PendingUnit, PatchError> {
        self.open_unit_at(kind, install_path, Local::now())
    }

    /// Like [`open_unit`](Self::open_unit) with an explicit clock reading.
    ///
    /// A second unit opened within the same second gets a `-N` suffix so it
    /// never merges into the first.
    pub fn open_unit_at(
        &self,
        kind: BackupKind,
        install_path: &Path,
        now: DateTime<Local>,
    ) -> Result<PendingUnit, PatchError> {
        fs::create_dir_all(&self.root).map_err(|e| PatchError::io(&self.root, e))?;

        let stem = format!("{}_{}", now.format(DIR_TIMESTAMP_FORMAT), kind.tag());
        let mut dir = self.root.join(&stem);
        let mut attempt = 1;
        loop {
            match fs::create_dir(&dir) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    dir = self.root.join(format!("{stem}-{attempt}"));
                }
                Err(e) => return Err(PatchError::io(&dir, e)),
            }
        }

        tracing::info!(unit = %dir.display(), %kind, "opened backup unit");

        Ok(PendingUnit {
            dir,
            manifest: Manifest {
                timestamp: now.format(RECORD_TIMESTAMP_FORMAT).to_string(),
                install_path: install_path.to_path_buf(),
                backup_type: kind,
                files: BTreeMap::new(),
            },
        })
    }

    /// Copy `original` byte-for-byte into the unit and record it.
    ///
    /// Returns the backup file name. The copy keeps the original's
    /// modification time.
    pub fn backup_file(
        &self,
        unit: &mut PendingUnit,
        original: &Path,
    ) -> Result<String, PatchError> {
        let name = unit.backup_name_for(original)?;
        let content = fs::read(original).map_err(|e| PatchError::io(original, e))?;
        let dest = unit.dir.join(&name);

        fs::write(&dest, &content).map_err(|e| PatchError::io(&dest, e))?;
        if let Ok(meta) = fs::metadata(original) {
            if let Err(e) = fsio::copy_mtime(&meta, &dest) {
                tracing::debug!(path = %dest.display(), error = %e, "could not preserve mtime");
            }
        }

        tracing::debug!(
            original = %original.display(),
            backup = %dest.display(),
            bytes = content.len(),
            "backed up file"
        );

        unit.manifest.files.insert(original.to_path_buf(), name.clone());
        Ok(name)
    }

    /// Write the manifest, making the unit restorable.
    pub fn persist_manifest(&self, unit: PendingUnit) -> Result<BackupUnit, PatchError> {
        let path = unit.dir.join(MANIFEST_FILE_NAME);
        let json = unit.manifest.to_json().map_err(|source| PatchError::Serialization {
            path: path.clone(),
            source,
        })?;
        fsio::atomic_write(&path, json.as_bytes()).map_err(|e| PatchError::io(&path, e))?;

        tracing::info!(
            manifest = %path.display(),
            files = unit.manifest.files.len(),
            "persisted backup manifest"
        );

        Ok(BackupUnit {
            dir: unit.dir,
            manifest: unit.manifest,
        })
    }
}
