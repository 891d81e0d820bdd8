//! End-to-end patch and restore against a mock install tree
//!
//! Tests the complete workflow:
//! 1. Back up every target before it is rewritten
//! 2. Translate with the shipped rule tables
//! 3. Keep going when one file fails
//! 4. Restore the install byte for byte

use locale_patcher::backup::MANIFEST_FILE_NAME;
use locale_patcher::report::{BatchStatus, FileAction};
use locale_patcher::rules::{self, RuleBook};
use locale_patcher::{patch_host, BackupStore, HostApp, PatchError, RestoreEngine};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const AGENT_JS: &str = r#"const s={a:"Account",b:"Email",c:"Account"};function p(e){switch(e){case 1:return"Always Proceed";default:return"Request Review"}}"#;
const WORKBENCH_JS: &str = r#"label:"Review Policy",help:"Agent always asks for review.""#;
const CHAT_JS: &str = r#"button:"Send",hint:"Agent is working...""#;
const PRODUCT_JSON: &str = "{\n\t\"checksums\": {\n\t\t\"vs/base/preload.js\": \"aaa\",\n\t\t\"jetskiAgent/main.js\": \"bbb\",\n\t\t\"vs/workbench/workbench.desktop.main.js\": \"ccc\"\n\t}\n}\n";

struct MockInstall {
    _dir: TempDir,
    root: PathBuf,
    backups: PathBuf,
}

impl MockInstall {
    fn agent(&self) -> PathBuf {
        self.root.join("resources/app/out/jetskiAgent/main.js")
    }

    fn workbench(&self) -> PathBuf {
        self.root
            .join("resources/app/out/vs/workbench/workbench.desktop.main.js")
    }

    fn chat(&self) -> PathBuf {
        self.root
            .join("resources/app/extensions/antigravity/out/media/chat.js")
    }

    fn product(&self) -> PathBuf {
        self.root.join("resources/app/product.json")
    }

    fn store(&self) -> BackupStore {
        BackupStore::new(&self.backups)
    }
}

fn write(path: &Path, content: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Create a minimal Antigravity install with all three bundles
fn setup_install() -> MockInstall {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Antigravity");
    fs::create_dir_all(&root).unwrap();

    // Resolve symlinked temp roots so manifest keys compare equal
    let install = MockInstall {
        root: root.canonicalize().unwrap(),
        backups: dir.path().join("antigravity_backup"),
        _dir: dir,
    };

    write(&install.agent(), AGENT_JS);
    write(&install.workbench(), WORKBENCH_JS);
    write(&install.chat(), CHAT_JS);
    write(&install.product(), PRODUCT_JSON);
    install
}

fn shipped_rules() -> RuleBook {
    rules::load_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("rules")).unwrap()
}

#[test]
fn test_backup_precedes_mutation() {
    let install = setup_install();

    let outcome = patch_host(
        &install.store(),
        HostApp::Antigravity,
        &install.root,
        &shipped_rules(),
    )
    .unwrap();

    assert!(outcome.is_clean(), "{:?}", outcome.report);
    assert_eq!(outcome.report.status(), BatchStatus::Complete { succeeded: 3 });

    let unit = outcome.unit.unwrap();
    for (path, original) in [
        (install.agent(), AGENT_JS),
        (install.workbench(), WORKBENCH_JS),
        (install.chat(), CHAT_JS),
        (install.product(), PRODUCT_JSON),
    ] {
        let backup_name = unit
            .files()
            .get(&path)
            .unwrap_or_else(|| panic!("{} missing from manifest", path.display()));
        assert_eq!(
            fs::read_to_string(unit.backup_path(backup_name)).unwrap(),
            original
        );
    }

    let agent = fs::read_to_string(install.agent()).unwrap();
    assert!(agent.contains(r#"a:"账户",b:"邮箱",c:"账户""#));
    assert!(agent.contains(r#"return"始终继续";default:return"请求确认""#));
    assert!(fs::read_to_string(install.workbench())
        .unwrap()
        .contains(r#"help:"代理始终请求确认。""#));
}

#[test]
fn test_translation_stats_count_rules_not_occurrences() {
    let install = setup_install();

    let outcome = patch_host(
        &install.store(),
        HostApp::Antigravity,
        &install.root,
        &shipped_rules(),
    )
    .unwrap();

    let agent = outcome
        .report
        .outcomes
        .iter()
        .find(|o| o.path == install.agent())
        .unwrap();
    match agent.result.as_ref().unwrap() {
        FileAction::Patched { stats, .. } => {
            // "Account" occurs twice but counts once
            assert_eq!(stats.exact, 4);
            assert_eq!(stats.template, 0);
            assert_eq!(stats.variable, 0);
        }
        other => panic!("unexpected action {other:?}"),
    }
}

#[test]
fn test_product_checksums_stripped_and_restorable() {
    let install = setup_install();
    let store = install.store();

    let outcome = patch_host(&store, HostApp::Antigravity, &install.root, &shipped_rules())
        .unwrap();
    assert!(outcome.checksums.unwrap().is_ok());

    let product = fs::read_to_string(install.product()).unwrap();
    assert!(!product.contains("jetskiAgent"));
    assert!(!product.contains("workbench.desktop.main.js"));
    let value: serde_json::Value = serde_json::from_str(&product).unwrap();
    assert_eq!(value["checksums"].as_object().unwrap().len(), 1);

    let engine = RestoreEngine::for_store(&store);
    let unit = engine.latest().unwrap().unwrap();
    let report = engine.restore_unit(&unit);
    assert!(!report.is_partial_failure());
    assert_eq!(fs::read_to_string(install.product()).unwrap(), PRODUCT_JSON);
}

#[test]
#[cfg(unix)]
fn test_partial_failure_isolation() {
    use std::os::unix::fs::PermissionsExt;

    let install = setup_install();
    fs::set_permissions(install.workbench(), fs::Permissions::from_mode(0o444)).unwrap();

    let outcome = patch_host(
        &install.store(),
        HostApp::Antigravity,
        &install.root,
        &shipped_rules(),
    )
    .unwrap();

    assert_eq!(
        outcome.report.status(),
        BatchStatus::PartialFailure {
            succeeded: 2,
            attempted: 3
        }
    );
    assert!(!outcome.is_clean());

    let (failed, err) = outcome.report.failures().next().unwrap();
    assert_eq!(failed.path, install.workbench());
    assert!(matches!(err, PatchError::Io { .. }));

    // Neighbours were still translated
    assert!(fs::read_to_string(install.agent()).unwrap().contains("账户"));
    assert!(fs::read_to_string(install.chat()).unwrap().contains("发送"));
    assert_eq!(fs::read_to_string(install.workbench()).unwrap(), WORKBENCH_JS);

    // The failed file was backed up before the write was refused
    let unit = outcome.unit.unwrap();
    assert_eq!(unit.files().len(), 4);
    let name = &unit.files()[&install.workbench()];
    assert_eq!(
        fs::read_to_string(unit.backup_path(name)).unwrap(),
        WORKBENCH_JS
    );

    fs::set_permissions(install.workbench(), fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
#[cfg(unix)]
fn test_patch_and_restore_keep_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let install = setup_install();
    let files = [
        install.agent(),
        install.workbench(),
        install.chat(),
        install.product(),
    ];
    for path in &files {
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
    }
    let mode = |path: &PathBuf| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    let store = install.store();

    let outcome = patch_host(&store, HostApp::Antigravity, &install.root, &shipped_rules())
        .unwrap();
    assert!(outcome.is_clean());
    for path in &files {
        assert_eq!(mode(path), 0o644, "{} after patch", path.display());
    }

    let report = RestoreEngine::for_store(&store).restore_unit(&outcome.unit.unwrap());
    assert_eq!(report.status(), BatchStatus::Complete { succeeded: 4 });
    for path in &files {
        assert_eq!(mode(path), 0o644, "{} after restore", path.display());
    }
    assert_eq!(fs::read_to_string(install.agent()).unwrap(), AGENT_JS);
}

#[test]
fn test_restore_after_failed_translation() {
    let install = setup_install();
    let not_utf8: &[u8] = &[0x22, 0xff, 0xfe, 0x22];
    write(&install.chat(), not_utf8);
    let store = install.store();

    let outcome = patch_host(&store, HostApp::Antigravity, &install.root, &shipped_rules())
        .unwrap();

    let (failed, _) = outcome.report.failures().next().unwrap();
    assert_eq!(failed.path, install.chat());
    let unit = outcome.unit.unwrap();
    assert!(unit.files().contains_key(&install.chat()));

    // Simulate later damage to the file, then restore
    write(&install.chat(), "corrupted");
    let report = RestoreEngine::for_store(&store).restore_unit(&unit);

    assert_eq!(report.status(), BatchStatus::Complete { succeeded: 4 });
    assert_eq!(fs::read(install.chat()).unwrap(), not_utf8);
    assert_eq!(fs::read_to_string(install.agent()).unwrap(), AGENT_JS);
    assert_eq!(fs::read_to_string(install.workbench()).unwrap(), WORKBENCH_JS);
}

#[test]
fn test_repatch_is_idempotent() {
    let install = setup_install();
    let store = install.store();
    let rules = shipped_rules();

    let first = patch_host(&store, HostApp::Antigravity, &install.root, &rules).unwrap();
    assert!(first.is_clean());
    let after_first = fs::read_to_string(install.agent()).unwrap();

    let second = patch_host(&store, HostApp::Antigravity, &install.root, &rules).unwrap();
    for outcome in &second.report.outcomes {
        match outcome.result.as_ref().unwrap() {
            FileAction::Patched { stats, .. } => assert!(stats.is_empty()),
            other => panic!("unexpected action {other:?}"),
        }
    }
    assert_eq!(fs::read_to_string(install.agent()).unwrap(), after_first);
    assert_eq!(
        second.checksums.unwrap().unwrap(),
        locale_patcher::checksum::ChecksumOutcome::AlreadyStripped
    );

    // Each run produced its own restorable unit
    assert_eq!(RestoreEngine::for_store(&store).list_units().unwrap().len(), 2);
}

#[test]
fn test_manifest_wire_format() {
    let install = setup_install();

    let outcome = patch_host(
        &install.store(),
        HostApp::Antigravity,
        &install.root,
        &shipped_rules(),
    )
    .unwrap();
    let unit = outcome.unit.unwrap();

    let json = fs::read_to_string(unit.dir().join(MANIFEST_FILE_NAME)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["backup_type"], "antigravity");
    assert_eq!(
        value["install_path"].as_str().map(PathBuf::from),
        Some(install.root.clone())
    );
    assert!(value["timestamp"].as_str().is_some());
    assert_eq!(value["files"].as_object().unwrap().len(), 4);
    assert!(unit.name().ends_with("_antigravity"));
}

#[test]
fn test_continue_extension_unit() {
    let dir = TempDir::new().unwrap();
    let extension = dir.path().join("continue.continue-1.2.3-linux-x64");
    let index = extension.join("gui/assets/index.js");
    write(&index, r#"tabs:["Chat","Agent"],title:"Settings""#);
    let extension = extension.canonicalize().unwrap();
    let store = BackupStore::new(dir.path().join("backups"));

    let outcome = patch_host(&store, HostApp::Continue, &extension, &shipped_rules()).unwrap();

    assert!(outcome.is_clean());
    assert!(outcome.checksums.is_none());
    assert_eq!(
        fs::read_to_string(&index).unwrap(),
        r#"tabs:["聊天","代理"],title:"设置""#
    );

    let unit = outcome.unit.unwrap();
    assert_eq!(unit.manifest().install_path, extension);
    assert!(unit.name().ends_with("_continue"));
}

#[test]
fn test_invalid_install_creates_no_unit() {
    let dir = TempDir::new().unwrap();
    let store = BackupStore::new(dir.path().join("backups"));
    fs::create_dir_all(dir.path().join("NotAntigravity")).unwrap();

    let err = patch_host(
        &store,
        HostApp::Antigravity,
        dir.path().join("NotAntigravity"),
        &shipped_rules(),
    )
    .unwrap_err();

    assert!(matches!(err, PatchError::Path { .. }));
    assert!(RestoreEngine::for_store(&store).list_units().unwrap().is_empty());
}
