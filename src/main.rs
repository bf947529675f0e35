//! CLI entry point for trade-prefs
//!
//! Inspects and edits the persisted preference file: show, get and set
//! fields, rebind hotkeys, and check a file for problems.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use trade_prefs::core::{trading_schema, CollisionPolicy, HotkeyAction, PrefPath};
use trade_prefs::host::Controller;
use trade_prefs::store::{FileAdapter, LoadSource, StoreOptions, DEFAULT_BACKUPS_KEPT};

#[derive(Parser)]
#[command(name = "trade-prefs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the preferences file
    #[arg(
        short,
        long,
        global = true,
        env = "TRADE_PREFS_FILE",
        default_value = "~/.config/trade-prefs/preferences.json"
    )]
    file: PathBuf,

    /// What to do when a hotkey is already taken: allow, reject or swap
    #[arg(long, global = true, env = "TRADE_PREFS_COLLISIONS", default_value_t = CollisionPolicy::Allow)]
    collisions: CollisionPolicy,

    /// Do not keep a timestamped copy of the previous file on save
    #[arg(long, global = true)]
    no_backup: bool,

    /// How many backups to keep; older ones are deleted on save
    #[arg(long, global = true, env = "TRADE_PREFS_KEEP_BACKUPS", default_value_t = DEFAULT_BACKUPS_KEPT)]
    keep_backups: usize,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every preference, marking values changed from the defaults
    Show,

    /// Print one preference
    Get {
        /// Dotted path, e.g. orderEntry.defaultQuantity
        path: String,
    },

    /// Change one preference and save
    Set {
        /// Dotted path, e.g. orderEntry.defaultQuantity
        path: String,
        /// New value, parsed according to the field's type
        value: String,
    },

    /// Restore the factory defaults and save
    Reset,

    /// Bind a hotkey action to a key combination and save
    Bind {
        /// quickBuy, quickSell, cancelAll or autoTradeToggle
        action: String,
        /// Key combination, e.g. Ctrl+B
        combo: String,
    },

    /// List hotkey bindings and conflicts
    Bindings,

    /// List preferences that differ from the defaults
    Diff,

    /// Report problems in the saved file (exit code 1 if any)
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let path = expand_path(&cli.file)?;
    let mut adapter = FileAdapter::new(path);
    if !cli.no_backup {
        adapter = adapter.with_backups_kept(cli.keep_backups);
    }

    let options = StoreOptions {
        collision_policy: cli.collisions,
    };
    let mut controller = Controller::new(trading_schema(), options, adapter);
    controller.load()?;

    match cli.command {
        Commands::Show => show(&controller),
        Commands::Get { path } => get(&controller, &path)?,
        Commands::Set { path, value } => set(&mut controller, &path, &value)?,
        Commands::Reset => {
            controller.reset()?;
            controller.save()?;
            println!("{} Preferences reset to defaults", "✓".green());
        }
        Commands::Bind { action, combo } => bind(&mut controller, &action, &combo)?,
        Commands::Bindings => bindings(&controller),
        Commands::Diff => diff(&controller),
        Commands::Check => check(&controller),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand tilde in path
fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    let raw = path
        .to_str()
        .ok_or_else(|| anyhow!("Invalid path encoding"))?;
    Ok(PathBuf::from(shellexpand::tilde(raw).as_ref()))
}

fn show(controller: &Controller<FileAdapter>) {
    let store = controller.store();
    let changed: BTreeSet<String> = store
        .diff_from_defaults()
        .into_iter()
        .map(|change| change.path)
        .collect();

    println!(
        "{}",
        format!("Preferences from: {}\n", controller.adapter().path().display()).bold()
    );

    for (path, value) in store.live().leaves() {
        if changed.contains(&path) {
            println!("{} = {} {}", path.cyan().bold(), value, "(modified)".yellow());
        } else {
            println!("{} = {}", path.cyan(), value);
        }
    }

    println!("\n{} {} modified", "✓".green(), changed.len());
}

fn get(controller: &Controller<FileAdapter>, path: &str) -> anyhow::Result<()> {
    let value = controller.get(path)?;
    println!("{}", value);
    Ok(())
}

fn set(controller: &mut Controller<FileAdapter>, path: &str, raw: &str) -> anyhow::Result<()> {
    let pref_path = PrefPath::from(path);
    let field = controller
        .store()
        .schema()
        .field(&pref_path)
        .ok_or_else(|| anyhow!("'{}' is not a preference field", path))?;

    let value = field.parse_input(path, raw)?;
    controller.set(pref_path, value.clone())?;
    controller
        .save()
        .with_context(|| format!("Failed to save after setting {}", path))?;

    println!("{} {} = {}", "✓".green(), path.cyan(), value);
    Ok(())
}

fn bind(controller: &mut Controller<FileAdapter>, action: &str, combo: &str) -> anyhow::Result<()> {
    let action: HotkeyAction = action.parse().map_err(|e: String| anyhow!(e))?;

    controller.set(action.path(), combo)?;
    controller
        .save()
        .with_context(|| format!("Failed to save binding for {}", action))?;

    let bound = controller.get(action.path())?;
    println!("{} {} → {}", "✓".green(), action.label(), bound);
    Ok(())
}

fn bindings(controller: &Controller<FileAdapter>) {
    let store = controller.store();

    println!("{}", "Hotkeys\n".bold());
    for (action, combo) in controller.current_bindings() {
        println!(
            "{} → {}",
            format!("{}", combo).cyan().bold(),
            action.label().green()
        );
    }

    if let Some(enabled) = store.get("hotkeys.enabled").ok().and_then(|v| v.as_bool()) {
        if !enabled {
            println!("\n{}", "⚠ Hotkeys are disabled".yellow());
        }
    }

    print_conflicts(controller);
}

fn print_conflicts(controller: &Controller<FileAdapter>) -> usize {
    let conflicts = controller.store().binding_conflicts();
    if conflicts.is_empty() {
        return 0;
    }

    println!(
        "\n{} Found {} conflict{}:",
        "✗".red().bold(),
        conflicts.len(),
        if conflicts.len() == 1 { "" } else { "s" }
    );
    for conflict in &conflicts {
        let holders = conflict
            .paths
            .iter()
            .map(PrefPath::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {}", format!("{}", conflict.key_combo).cyan(), holders.dimmed());
    }
    conflicts.len()
}

fn diff(controller: &Controller<FileAdapter>) {
    let changes = controller.store().diff_from_defaults();
    if changes.is_empty() {
        println!("{} All preferences are at their defaults", "✓".green());
        return;
    }

    for change in &changes {
        println!(
            "{}: {} → {}",
            change.path.cyan(),
            format!("{}", change.before).dimmed(),
            format!("{}", change.after).green()
        );
    }
    println!("\n{} {} changed", "✓".green(), changes.len());
}

fn check(controller: &Controller<FileAdapter>) {
    let report = controller.store().load_report();
    let path = controller.adapter().path();
    let mut issues = 0;

    match &report.source {
        LoadSource::Defaults => {
            println!("{} No saved preferences at {}", "→".cyan(), path.display());
        }
        LoadSource::Persisted => {
            println!("{} Loaded {}", "→".cyan(), path.display());
        }
        LoadSource::Unreadable(reason) => {
            println!("{} Unreadable {}: {}", "✗".red().bold(), path.display(), reason);
            issues += 1;
        }
    }

    for key in &report.discarded {
        println!("  {} unknown field {}", "✗".red(), key.yellow());
        issues += 1;
    }
    for field in &report.reverted {
        println!("  {} {}: {}", "✗".red(), field.path.yellow(), field.reason);
        issues += 1;
    }

    issues += print_conflicts(controller);

    if issues == 0 {
        println!("{} {}", "✓".green().bold(), "No problems found!".bold());
    } else {
        println!("\n{}", format!("⚠ {} problem(s) found", issues).yellow());
        std::process::exit(1);
    }
}
