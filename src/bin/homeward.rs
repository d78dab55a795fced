// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use homeward::{
    category::catalog,
    path::{default_config_path, home_dir},
    Backup, BackupCategory, BackupStore, Category, CommandPackageManager, ExclusionSet, Restore,
    Settings,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inquire::MultiSelect;
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "homeward [options] <homeward-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = load_settings(self.config)?;
        match self.command {
            Command::Backup(opts) => run_backup(settings, opts),
            Command::Restore(opts) => run_restore(settings, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Back up selected parts of home directory into a new archive.
    #[command(override_usage = "homeward backup [options]")]
    Backup(BackupOptions),

    /// Restore home directory from most recent archive.
    #[command(override_usage = "homeward restore [options]")]
    Restore(RestoreOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BackupOptions {
    /// Dotfiles to leave out of the backup.
    #[arg(short, long, value_name = "dotfile", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Back up every category without prompting.
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RestoreOptions {
    /// Dotfiles to leave out of the restore, with or without leading dot.
    #[arg(short, long, value_name = "dotfile", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Keep archive in backup store after restoring.
    #[arg(short, long)]
    pub keep_archive: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_settings(explicit: Option<PathBuf>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let path = default_config_path()?;
            if !path.is_file() {
                return Ok(Settings::default());
            }
            path
        }
    };

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration {:?}", path.display()))?;
    let settings = data
        .parse::<Settings>()
        .with_context(|| format!("invalid configuration {:?}", path.display()))?;

    Ok(settings)
}

fn run_backup(settings: Settings, opts: BackupOptions) -> Result<()> {
    let mut categories = catalog(settings.backup.user_folders.iter().cloned());
    if !opts.all {
        select_categories(&mut categories)?;
    }

    let package_manager = CommandPackageManager::new(settings.package_manager.clone());
    let wants_manifest = categories
        .iter()
        .any(|item| item.selected && item.category == Category::PackageManifest);
    if wants_manifest {
        package_manager.locate()?;
    }

    let exclusions = ExclusionSet::for_backup(
        settings
            .backup
            .exclude
            .iter()
            .cloned()
            .chain(opts.exclude),
    );
    let store = BackupStore::with_prefix(settings.store_dir()?, &settings.store.prefix);
    let backup = Backup::new(home_dir()?, store, exclusions, package_manager);
    let summary = backup.run(&categories)?;

    if summary.warnings > 0 {
        warn!("backup finished with {} warning(s)", summary.warnings);
    }
    info!("backup written to {:?}", summary.archive.display());
    info!("copy it into the backup store of the new machine, then run `homeward restore` there");

    Ok(())
}

fn run_restore(settings: Settings, opts: RestoreOptions) -> Result<()> {
    let exclusions = ExclusionSet::for_restore(
        settings
            .restore
            .exclude
            .iter()
            .cloned()
            .chain(opts.exclude),
    );
    let store = BackupStore::with_prefix(settings.store_dir()?, &settings.store.prefix);
    let package_manager = CommandPackageManager::new(settings.package_manager.clone());
    let restore = Restore::new(home_dir()?, store, exclusions, package_manager)
        .keep_archive(opts.keep_archive || settings.restore.keep_archive);
    let summary = restore.run()?;

    if summary.restored.is_empty() {
        warn!("archive {:?} held nothing to restore", summary.archive.display());
    }
    if summary.warnings > 0 {
        warn!("restore finished with {} warning(s)", summary.warnings);
    }
    info!("restored from {:?}", summary.archive.display());

    Ok(())
}

fn select_categories(categories: &mut [BackupCategory]) -> Result<()> {
    let options = categories
        .iter()
        .map(|item| item.category.clone())
        .collect::<Vec<Category>>();
    let chosen = MultiSelect::new("Select what to back up", options)
        .with_all_selected_by_default()
        .prompt()
        .map_err(|err| anyhow!("selection aborted: {err}"))?;

    for item in categories.iter_mut() {
        item.selected = chosen.contains(&item.category);
    }

    Ok(())
}
