//! Locale Patcher: literal text localisation for installed desktop apps
//!
//! Rewrites UI strings inside the JavaScript bundles of an installed host
//! application using ordered tables of literal find/replace rules, and keeps
//! a timestamped backup of every file it touches so the install can be put
//! back exactly as it was.
//!
//! # Architecture
//!
//! - [`rules`] loads rule tables from TOML and checks them for ordering hazards.
//! - [`translate::apply`] is the pure substitution step.
//! - [`backup::BackupStore`] snapshots files into a unit; a unit only becomes
//!   restorable once its manifest is persisted.
//! - [`restore::RestoreEngine`] lists units and copies files back.
//! - [`applicator`] drives back up, translate, write for a whole host.
//!
//! # Safety
//!
//! - Every file is backed up before it is modified
//! - Atomic file writes (tempfile + fsync + rename)
//! - Install root boundary enforcement
//! - Batches are best effort: one failing file never stops the others
//!
//! The host application must be closed while patching or restoring.
//!
//! # Example
//!
//! ```no_run
//! use locale_patcher::{patch_host, BackupStore, HostApp};
//!
//! let rules = locale_patcher::rules::load_dir("rules")?;
//! let store = BackupStore::new("antigravity_backup");
//! let outcome = patch_host(&store, HostApp::Antigravity, "/opt/Antigravity", &rules)?;
//! println!("{}", outcome.report.status());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod applicator;
pub mod backup;
pub mod checksum;
pub mod discover;
pub mod error;
pub mod fsio;
pub mod report;
pub mod restore;
pub mod rules;
pub mod safety;
pub mod target;
pub mod translate;

// Re-exports
pub use applicator::{patch_host, patch_targets, PatchOutcome};
pub use backup::{BackupKind, BackupStore, BackupUnit, Manifest, PendingUnit};
pub use error::PatchError;
pub use report::{BatchReport, BatchStatus, FileAction, FileOutcome};
pub use restore::RestoreEngine;
pub use rules::{RuleBook, RuleSet, Tier};
pub use safety::InstallGuard;
pub use target::{FileType, HostApp, TargetFile};
pub use translate::{Translation, TranslationStats};
