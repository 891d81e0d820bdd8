//! Host applications and the asset files eligible for patching.

use crate::backup::BackupKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Selects which rule set a target file is translated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    /// Settings pages of the primary application
    Main,
    /// Chat panel of the primary application
    Chat,
    /// Continue extension GUI bundle
    Continue,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Main, FileType::Chat, FileType::Continue];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Main => "main",
            FileType::Chat => "chat",
            FileType::Continue => "continue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file inside a host install tree that may be patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    /// Path relative to the install root
    pub relative_path: PathBuf,
    /// Human-readable label for reports
    pub description: String,
    pub file_type: FileType,
}

impl TargetFile {
    /// Build a target from a `/`-separated relative path.
    pub fn new(relative_path: &str, description: impl Into<String>, file_type: FileType) -> Self {
        Self {
            relative_path: relative_path.split('/').collect(),
            description: description.into(),
            file_type,
        }
    }

    pub fn resolve(&self, install_root: &Path) -> PathBuf {
        install_root.join(&self.relative_path)
    }
}

/// The applications this tool knows how to patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostApp {
    Antigravity,
    Continue,
}

impl HostApp {
    pub fn label(&self) -> &'static str {
        match self {
            HostApp::Antigravity => "Antigravity",
            HostApp::Continue => "Continue extension",
        }
    }

    pub fn backup_kind(&self) -> BackupKind {
        match self {
            HostApp::Antigravity => BackupKind::PrimaryApp,
            HostApp::Continue => BackupKind::Extension,
        }
    }

    pub fn targets(&self) -> Vec<TargetFile> {
        match self {
            HostApp::Antigravity => vec![
                TargetFile::new(
                    "resources/app/out/jetskiAgent/main.js",
                    "Settings (agent)",
                    FileType::Main,
                ),
                TargetFile::new(
                    "resources/app/out/vs/workbench/workbench.desktop.main.js",
                    "Settings (workbench)",
                    FileType::Main,
                ),
                TargetFile::new(
                    "resources/app/extensions/antigravity/out/media/chat.js",
                    "Chat panel",
                    FileType::Chat,
                ),
            ],
            HostApp::Continue => vec![TargetFile::new(
                "gui/assets/index.js",
                "Continue GUI",
                FileType::Continue,
            )],
        }
    }

    /// Relative path whose presence marks a valid install root.
    pub fn root_marker(&self) -> PathBuf {
        match self {
            HostApp::Antigravity => ["resources", "app"].iter().collect(),
            HostApp::Continue => ["gui", "assets", "index.js"].iter().collect(),
        }
    }

    pub fn is_valid_root(&self, root: &Path) -> bool {
        root.is_dir() && root.join(self.root_marker()).exists()
    }
}

/// Targets from `targets` that currently exist under `install_root`.
pub fn detect_targets(install_root: &Path, targets: &[TargetFile]) -> Vec<TargetFile> {
    targets
        .iter()
        .filter(|t| t.resolve(install_root).is_file())
        .cloned()
        .collect()
}
