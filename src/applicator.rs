//! End-to-end patch flow: back up, translate, write back, persist manifest.
//!
//! The host application must be closed while this runs. Nothing here locks
//! the files or checks for a running process.

use crate::backup::{BackupKind, BackupStore, BackupUnit, PendingUnit};
use crate::checksum::{self, ChecksumOutcome};
use crate::error::PatchError;
use crate::fsio;
use crate::report::{BatchReport, FileAction, FileOutcome};
use crate::rules::RuleBook;
use crate::safety::InstallGuard;
use crate::target::{detect_targets, HostApp, TargetFile};
use crate::translate;
use std::path::PathBuf;

/// Result of one patch session.
#[derive(Debug)]
#[must_use = "PatchOutcome should be checked for partial failure"]
pub struct PatchOutcome {
    /// One entry per attempted target
    pub report: BatchReport,
    /// Extra files backed up into the unit without being translated
    pub side_files: Vec<(PathBuf, Result<String, PatchError>)>,
    /// The persisted unit, or why the manifest could not be written
    pub unit: Result<BackupUnit, PatchError>,
    /// `product.json` checksum removal, when it was attempted
    pub checksums: Option<Result<ChecksumOutcome, PatchError>>,
}

impl PatchOutcome {
    /// True when every target was patched and the unit is restorable.
    pub fn is_clean(&self) -> bool {
        !self.report.is_partial_failure()
            && self.unit.is_ok()
            && !matches!(self.checksums, Some(Err(_)))
    }
}

/// Patch `targets` under the guarded install root.
///
/// Each target is backed up before it is touched. A failure on one target is
/// recorded and the rest are still attempted. Every successful backup ends
/// up in the manifest, even when the later translate or write step failed,
/// so the file can always be restored. `side_files` are copied into the same
/// unit after the targets.
///
/// Only opening the backup unit is fatal.
pub fn patch_targets(
    store: &BackupStore,
    guard: &InstallGuard,
    kind: BackupKind,
    targets: &[TargetFile],
    side_files: &[PathBuf],
    rules: &RuleBook,
) -> Result<PatchOutcome, PatchError> {
    let mut unit = store.open_unit(kind, guard.root())?;
    let mut report = BatchReport::default();

    for target in targets {
        let path = target.resolve(guard.root());
        let result = patch_one(store, guard, &mut unit, target, rules);
        match &result {
            Ok(action) => tracing::info!(
                path = %path.display(),
                delta = action.size_delta(),
                "patched file"
            ),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "patch failed"),
        }
        report.push(FileOutcome {
            path,
            description: target.description.clone(),
            result,
        });
    }

    let side_files = side_files
        .iter()
        .map(|path| {
            let result = guard
                .validate_path(path)
                .and_then(|canonical| store.backup_file(&mut unit, &canonical));
            if let Err(e) = &result {
                tracing::warn!(path = %path.display(), error = %e, "side file backup failed");
            }
            (path.clone(), result)
        })
        .collect();

    let unit = store.persist_manifest(unit);
    if let Err(e) = &unit {
        tracing::error!(error = %e, "backup manifest not written; unit is not restorable");
    }

    Ok(PatchOutcome {
        report,
        side_files,
        unit,
        checksums: None,
    })
}

fn patch_one(
    store: &BackupStore,
    guard: &InstallGuard,
    unit: &mut PendingUnit,
    target: &TargetFile,
    rules: &RuleBook,
) -> Result<FileAction, PatchError> {
    let rule_set = rules
        .get(target.file_type)
        .ok_or(PatchError::MissingRuleSet(target.file_type))?;
    let path = guard.validate_path(target.resolve(guard.root()))?;

    let backup_name = store.backup_file(unit, &path)?;

    let content = fsio::read_text(&path).map_err(|e| PatchError::io(&path, e))?;
    let translation = translate::apply(&content, rule_set);
    fsio::atomic_write(&path, translation.content.as_bytes())
        .map_err(|e| PatchError::io(&path, e))?;

    Ok(FileAction::Patched {
        backup_name,
        stats: translation.stats,
        original_bytes: content.len(),
        new_bytes: translation.content.len(),
    })
}

/// Patch every present target of `host` installed at `install_root`.
///
/// Fails with a path error, before any backup is made, when the root is not
/// an install of `host` or none of its targets exist. For Antigravity the
/// install's `product.json` joins the unit and its bundle checksums are
/// removed once that backup has succeeded.
pub fn patch_host(
    store: &BackupStore,
    host: HostApp,
    install_root: impl Into<PathBuf>,
    rules: &RuleBook,
) -> Result<PatchOutcome, PatchError> {
    let guard = InstallGuard::for_host(host, install_root.into())?;

    let targets = detect_targets(guard.root(), &host.targets());
    if targets.is_empty() {
        return Err(PatchError::path(
            guard.root(),
            format!("no {} files to patch", host.label()),
        ));
    }
    tracing::debug!(host = host.label(), count = targets.len(), "detected targets");

    let product_json = checksum::product_json_path(guard.root());
    let side_files = match host {
        HostApp::Antigravity if product_json.is_file() => vec![product_json],
        _ => Vec::new(),
    };

    let mut outcome = patch_targets(
        store,
        &guard,
        host.backup_kind(),
        &targets,
        &side_files,
        rules,
    )?;

    let product_backed_up = outcome.side_files.iter().any(|(_, r)| r.is_ok());
    if product_backed_up && outcome.report.succeeded() > 0 {
        outcome.checksums = side_files
            .first()
            .map(|path| checksum::strip_product_checksums(path));
    }

    Ok(outcome)
}
