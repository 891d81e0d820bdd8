use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use locale_patcher::backup::BackupStore;
use locale_patcher::checksum::ChecksumOutcome;
use locale_patcher::discover;
use locale_patcher::report::{BatchReport, BatchStatus, FileAction};
use locale_patcher::rules::{self, find_collisions, RuleBook, Tier};
use locale_patcher::{patch_host, BackupUnit, HostApp, RestoreEngine};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "locale-patcher")]
#[command(about = "Localise UI strings of installed Antigravity builds", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up and translate a host application (close it first)
    Patch {
        #[command(subcommand)]
        host: PatchHost,
    },

    /// Copy a backup unit back over the install (close the host first)
    Restore {
        /// Backup root directory
        #[arg(short, long)]
        backup_root: Option<PathBuf>,

        /// Name of the unit directory to restore
        #[arg(short, long, conflicts_with = "latest")]
        unit: Option<String>,

        /// Restore the most recent unit
        #[arg(long)]
        latest: bool,
    },

    /// List restorable backup units, newest first
    List {
        /// Backup root directory
        #[arg(short, long)]
        backup_root: Option<PathBuf>,
    },

    /// Validate rule files and report ordering collisions
    Check {
        /// Directory containing the rule files
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum PatchHost {
    /// The Antigravity application bundles
    Antigravity {
        /// Install directory (discovered if not specified)
        #[arg(short, long)]
        install: Option<PathBuf>,

        /// Directory containing the rule files
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Backup root directory
        #[arg(short, long)]
        backup_root: Option<PathBuf>,
    },

    /// The Continue extension GUI
    Continue {
        /// Extension directory (newest installed version if not specified)
        #[arg(short, long)]
        extension: Option<PathBuf>,

        /// Directory containing the rule files
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Backup root directory
        #[arg(short, long)]
        backup_root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Patch { host } => match host {
            PatchHost::Antigravity {
                install,
                rules,
                backup_root,
            } => cmd_patch(HostApp::Antigravity, install, rules, backup_root),
            PatchHost::Continue {
                extension,
                rules,
                backup_root,
            } => cmd_patch(HostApp::Continue, extension, rules, backup_root),
        },

        Commands::Restore {
            backup_root,
            unit,
            latest,
        } => cmd_restore(backup_root, unit, latest),

        Commands::List { backup_root } => cmd_list(backup_root),

        Commands::Check { rules } => cmd_check(rules),
    }
}

/// Flag, then environment variable, then `./rules`.
fn resolve_rules_dir(cli_rules: Option<PathBuf>) -> PathBuf {
    cli_rules
        .or_else(|| env::var_os("LOCALE_PATCHER_RULES").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("rules"))
}

/// Flag, then environment variable, then next to the executable.
fn resolve_backup_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return Ok(path);
    }
    if let Some(path) = env::var_os("LOCALE_PATCHER_BACKUP_ROOT") {
        return Ok(PathBuf::from(path));
    }
    Ok(BackupStore::default_root()?)
}

/// Flag, then environment variable, then filesystem discovery.
fn resolve_install(host: HostApp, cli_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        return Ok(path);
    }

    if host == HostApp::Antigravity {
        if let Some(env_path) = env::var_os("LOCALE_PATCHER_INSTALL") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(path);
            }
            eprintln!(
                "{}",
                format!(
                    "Warning: LOCALE_PATCHER_INSTALL is set but path doesn't exist: {}",
                    path.display()
                )
                .yellow()
            );
        }
    }

    let found = match host {
        HostApp::Antigravity => discover::find_antigravity_install(),
        HostApp::Continue => discover::default_extensions_dir()
            .and_then(|dir| discover::find_continue_extension(&dir)),
    };

    if let Some(path) = found {
        println!(
            "{}",
            format!("Auto-detected {}: {}", host.label(), path.display()).dimmed()
        );
        return Ok(path);
    }

    let hint = match host {
        HostApp::Antigravity => {
            "locale-patcher patch antigravity --install <DIR>  (or set LOCALE_PATCHER_INSTALL)"
        }
        HostApp::Continue => "locale-patcher patch continue --extension <DIR>",
    };
    anyhow::bail!(
        "{}\n{}\n  {}",
        format!("Could not find a {} installation.", host.label()).red(),
        "Specify it explicitly:".bold(),
        hint
    )
}

fn load_rule_book(rules_dir: Option<PathBuf>) -> Result<RuleBook> {
    let dir = resolve_rules_dir(rules_dir);
    let book = rules::load_dir(&dir)
        .with_context(|| format!("failed to load rules from {}", dir.display()))?;
    if book.is_empty() {
        anyhow::bail!("No .toml rule files found in {}", dir.display());
    }
    Ok(book)
}

fn format_stats(action: &FileAction) -> String {
    match action {
        FileAction::Patched {
            stats,
            original_bytes,
            new_bytes,
            ..
        } => {
            let counts: Vec<String> = Tier::ALL
                .iter()
                .map(|tier| format!("{} {}", stats.count(*tier), tier))
                .collect();
            format!(
                "{} ({} -> {} bytes, {:+})",
                counts.join(", "),
                original_bytes,
                new_bytes,
                action.size_delta()
            )
        }
        FileAction::Restored { bytes } => format!("{bytes} bytes"),
    }
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(action) => println!(
                "{} {}: {}",
                "✓".green(),
                outcome.description,
                format_stats(action)
            ),
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), outcome.description, e);
                eprintln!("  File: {}", outcome.path.display());
            }
        }
    }
}

fn print_status(status: BatchStatus) {
    let line = status.to_string();
    match status {
        BatchStatus::Complete { .. } => println!("{} {}", "Summary:".bold(), line.green()),
        BatchStatus::PartialFailure { .. } => println!("{} {}", "Summary:".bold(), line.red()),
        BatchStatus::Empty => println!("{} {}", "Summary:".bold(), line.yellow()),
    }
}

fn cmd_patch(
    host: HostApp,
    install: Option<PathBuf>,
    rules_dir: Option<PathBuf>,
    backup_root: Option<PathBuf>,
) -> Result<()> {
    let install = resolve_install(host, install)?;
    let rule_book = load_rule_book(rules_dir)?;
    let store = BackupStore::new(resolve_backup_root(backup_root)?);

    println!("{}: {}", host.label(), install.display());
    println!("Backups: {}", store.root().display());
    println!(
        "{}",
        format!("Make sure {} is closed before continuing.", host.label()).dimmed()
    );
    println!();

    for target in host.targets() {
        if !rule_book.contains(target.file_type) {
            eprintln!(
                "{}",
                format!(
                    "Warning: no '{}' rules loaded; {} will not be patched",
                    target.file_type, target.description
                )
                .yellow()
            );
        }
    }

    let outcome = match patch_host(&store, host, &install, &rule_book) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    print_report(&outcome.report);

    for (path, result) in &outcome.side_files {
        match result {
            Ok(name) => println!("{} backed up {} as {}", "⊙".yellow(), path.display(), name),
            Err(e) => eprintln!("{} {}: {}", "✗".red(), path.display(), e),
        }
    }

    match &outcome.checksums {
        Some(Ok(ChecksumOutcome::Removed(count))) => {
            println!("{} removed {} product.json checksum(s)", "✓".green(), count)
        }
        Some(Ok(ChecksumOutcome::AlreadyStripped)) => {
            println!("{} product.json checksums already removed", "⊙".yellow())
        }
        Some(Err(e)) => eprintln!("{} product.json: {}", "✗".red(), e),
        None => {}
    }

    println!();
    match &outcome.unit {
        Ok(unit) => println!("Backup unit: {}", unit.dir().display()),
        Err(e) => eprintln!(
            "{} {}",
            "Backup manifest could not be written; this run cannot be restored:".red(),
            e
        ),
    }
    print_status(outcome.report.status());

    if !outcome.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_unit(unit: &BackupUnit) {
    let manifest = unit.manifest();
    println!(
        "{}  {}  {}",
        unit.name().bold(),
        manifest.backup_type.label(),
        manifest.timestamp.dimmed()
    );
    println!("  Install: {}", manifest.install_path.display());
    for (original, name) in &manifest.files {
        println!("    {} <- {}", original.display(), name);
    }
}

fn cmd_restore(backup_root: Option<PathBuf>, unit: Option<String>, latest: bool) -> Result<()> {
    let engine = RestoreEngine::new(resolve_backup_root(backup_root)?);

    let unit = match (unit, latest) {
        (Some(name), _) => engine.find_unit(&name)?,
        (None, true) => match engine.latest()? {
            Some(unit) => unit,
            None => anyhow::bail!("No backups found in {}", engine.root().display()),
        },
        (None, false) => {
            cmd_list_units(&engine)?;
            anyhow::bail!("Choose a unit with --unit <NAME> or use --latest")
        }
    };

    println!("Restoring {}", unit.name().bold());
    println!(
        "{}",
        format!("Make sure {} is closed before continuing.", unit.kind().label()).dimmed()
    );
    println!();

    let report = engine.restore_unit(&unit);
    print_report(&report);
    println!();
    print_status(report.status());

    if report.is_partial_failure() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list_units(engine: &RestoreEngine) -> Result<()> {
    let units = engine.list_units()?;
    if units.is_empty() {
        println!("No backups found in {}", engine.root().display());
        return Ok(());
    }
    for unit in &units {
        print_unit(unit);
    }
    Ok(())
}

fn cmd_list(backup_root: Option<PathBuf>) -> Result<()> {
    let engine = RestoreEngine::new(resolve_backup_root(backup_root)?);
    println!("Backups in {}:\n", engine.root().display());
    cmd_list_units(&engine)
}

fn cmd_check(rules_dir: Option<PathBuf>) -> Result<()> {
    let rule_book = load_rule_book(rules_dir)?;
    let mut total_collisions = 0;

    for (file_type, set) in rule_book.iter() {
        println!(
            "{} [{}]: {} exact, {} template, {} variable",
            set.name().bold(),
            file_type,
            set.count_in(Tier::Exact),
            set.count_in(Tier::Template),
            set.count_in(Tier::Variable)
        );

        let collisions = find_collisions(set);
        if collisions.is_empty() {
            println!("  {} no ordering collisions", "✓".green());
        }
        for collision in &collisions {
            let entries = set.rules();
            eprintln!("  {} {}", "✗".red(), collision);
            eprintln!(
                "    #{}: {:?} -> {:?}",
                collision.first, entries[collision.first].from, entries[collision.first].to
            );
            eprintln!(
                "    #{}: {:?} -> {:?}",
                collision.second, entries[collision.second].from, entries[collision.second].to
            );
        }
        total_collisions += collisions.len();
    }

    println!();
    if total_collisions > 0 {
        println!(
            "{} {}",
            "Summary:".bold(),
            format!("{total_collisions} collision(s)").red()
        );
        std::process::exit(1);
    }
    println!("{} {}", "Summary:".bold(), "rules are collision-free".green());

    Ok(())
}
