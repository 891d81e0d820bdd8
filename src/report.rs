//! Per-file outcomes and batch aggregation.

use crate::error::PatchError;
use crate::translate::TranslationStats;
use std::fmt;
use std::path::PathBuf;

/// What happened to a file that was processed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Patched {
        backup_name: String,
        stats: TranslationStats,
        original_bytes: usize,
        new_bytes: usize,
    },
    Restored {
        bytes: usize,
    },
}

impl FileAction {
    /// Signed byte delta of a patch; zero for restores.
    pub fn size_delta(&self) -> i64 {
        match self {
            FileAction::Patched {
                original_bytes,
                new_bytes,
                ..
            } => *new_bytes as i64 - *original_bytes as i64,
            FileAction::Restored { .. } => 0,
        }
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub description: String,
    pub result: Result<FileAction, PatchError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Batch-level result: best effort, never all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Nothing was attempted
    Empty,
    Complete { succeeded: usize },
    PartialFailure { succeeded: usize, attempted: usize },
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Empty => write!(f, "nothing to do"),
            BatchStatus::Complete { succeeded } => write!(f, "{succeeded}/{succeeded} succeeded"),
            BatchStatus::PartialFailure {
                succeeded,
                attempted,
            } => write!(f, "{succeeded}/{attempted} succeeded"),
        }
    }
}

#[derive(Debug, Default)]
#[must_use = "BatchReport should be checked for partial failure"]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileOutcome, &PatchError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }

    pub fn status(&self) -> BatchStatus {
        let attempted = self.attempted();
        let succeeded = self.succeeded();
        if attempted == 0 {
            BatchStatus::Empty
        } else if succeeded == attempted {
            BatchStatus::Complete { succeeded }
        } else {
            BatchStatus::PartialFailure {
                succeeded,
                attempted,
            }
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self.status(), BatchStatus::PartialFailure { .. })
    }
}
