use crate::target::FileType;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single file- or unit-level operation.
///
/// Batch operations never return these directly; they collect one per file
/// into a [`BatchReport`](crate::report::BatchReport) and keep going.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid path {path}: {reason}")]
    Path { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup copy not found: {path}")]
    NotFound { path: PathBuf },

    #[error("malformed backup manifest {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no rule set loaded for file type '{0}'")]
    MissingRuleSet(FileType),
}

impl PatchError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn path(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        PatchError::Path {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Short label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            PatchError::Path { .. } => "path",
            PatchError::Io { .. } => "io",
            PatchError::NotFound { .. } => "not-found",
            PatchError::Serialization { .. } => "manifest",
            PatchError::MissingRuleSet(_) => "rules",
        }
    }
}
