// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Backup orchestration.
//!
//! A backup stages every selected category into a timestamped staging
//! directory inside the backup store, serializes that directory into one
//! archive, and then throws the staging directory away.
//!
//! # Severity
//!
//! Failing to create the staging directory, failing on a category as a
//! whole, or failing to create the archive aborts the run. A category that
//! fails leaves the run without an archive, because a partial backup the
//! operator does not know about is worse than none. Anything smaller, such as
//! one dotfile that cannot be read or one archive entry that cannot be
//! stored, is logged as a warning and skipped.

use crate::{
    archive::{ArchiveError, ArchiveWriter, WriteReport},
    category::{
        BackupCategory, Category, CategoryError, DOTFILES_DIR, DOTFILE_MARKER, USERFILES_DIR,
    },
    copy::{CopyError, CopyReport, PathCopier, SymlinkPolicy},
    exclude::ExclusionSet,
    package::{CommandPackageManager, PackageManager},
    store::BackupStore,
};

use chrono::{Local, NaiveDateTime};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Backup orchestrator.
#[derive(Debug)]
pub struct Backup<P = CommandPackageManager>
where
    P: PackageManager,
{
    home: PathBuf,
    store: BackupStore,
    exclusions: ExclusionSet,
    package_manager: P,
}

impl<P> Backup<P>
where
    P: PackageManager,
{
    /// Construct new backup orchestrator.
    ///
    /// The exclusion set is used as-is, so callers wanting the built-in
    /// defaults should build it through [`ExclusionSet::for_backup`].
    pub fn new(
        home: impl Into<PathBuf>,
        store: BackupStore,
        exclusions: ExclusionSet,
        package_manager: P,
    ) -> Self {
        Self {
            home: home.into(),
            store,
            exclusions,
            package_manager,
        }
    }

    /// Back up selected categories using current local time.
    ///
    /// # Errors
    ///
    /// - Return [`BackupError`] under the same conditions as
    ///   [`Backup::run_at`].
    pub fn run(&self, categories: &[BackupCategory]) -> Result<BackupSummary> {
        self.run_at(categories, Local::now().naive_local())
    }

    /// Back up selected categories as a backup taken at given time.
    ///
    /// Categories are processed one at a time in the order given. Unselected
    /// categories are ignored. An empty selection still produces an archive.
    ///
    /// # Errors
    ///
    /// - Return [`BackupError::CreateStaging`] if staging directory cannot
    ///   be created, or already exists.
    /// - Return [`BackupError::Category`] if any category fails as a whole.
    /// - Return [`BackupError::Archive`] if the archive cannot be written.
    #[instrument(skip(self, categories), level = "debug")]
    pub fn run_at(
        &self,
        categories: &[BackupCategory],
        timestamp: NaiveDateTime,
    ) -> Result<BackupSummary> {
        let staging = self.store.staging_dir(&timestamp);
        fs::create_dir_all(self.store.path())
            .and_then(|_| fs::create_dir(&staging))
            .map_err(|err| BackupError::CreateStaging {
                source: err,
                path: staging.clone(),
            })?;

        let staged = self.stage_all(categories, &staging).and_then(|warnings| {
            let archive = BackupStore::archive_path(&staging);
            info!("write archive {:?}", archive.display());
            let report = ArchiveWriter::new().write(&staging, &archive)?;
            Ok(BackupSummary {
                archive,
                warnings: warnings + report_archive(&report),
            })
        });

        // INVARIANT: Staging directory never outlives the run, even a failed one.
        let cleaned = discard_dir(&staging);
        let mut summary = staged?;
        if !cleaned {
            summary.warnings += 1;
        }

        Ok(summary)
    }

    fn stage_all(&self, categories: &[BackupCategory], staging: &Path) -> Result<usize> {
        let mut warnings = 0;
        for item in categories.iter().filter(|item| item.selected) {
            info!("back up {}", item.category);
            warnings += self
                .stage(&item.category, staging)
                .map_err(|err| BackupError::Category {
                    source: err,
                    category: item.category.clone(),
                })?;
        }

        Ok(warnings)
    }

    fn stage(&self, category: &Category, staging: &Path) -> Result<usize, CategoryError> {
        category.validate()?;

        match category {
            Category::PackageManifest => self.stage_package_manifest(staging),
            Category::DotfileCollection => self.stage_dotfiles(staging),
            Category::NamedUserFolder(name) => self.stage_user_folder(name, staging),
        }
    }

    fn stage_package_manifest(&self, staging: &Path) -> Result<usize, CategoryError> {
        self.package_manager.dump(staging)?;

        let manifest = staging.join(self.package_manager.manifest_name());
        if !manifest.is_file() {
            warn!("package manager left no manifest at {:?}", manifest.display());
            return Ok(1);
        }

        Ok(0)
    }

    fn stage_dotfiles(&self, staging: &Path) -> Result<usize, CategoryError> {
        let dotfiles = staging.join(DOTFILES_DIR);
        fs::create_dir_all(&dotfiles).map_err(|err| CategoryError::Io {
            source: err,
            path: dotfiles.clone(),
        })?;

        let entries = fs::read_dir(&self.home).map_err(|err| CategoryError::Io {
            source: err,
            path: self.home.clone(),
        })?;

        let copier = self.copier(staging);
        let mut warnings = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("failed to list entry of {:?}: {err}", self.home.display());
                    warnings += 1;
                    continue;
                }
            };

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!("skip dotfile with non UTF-8 name {name:?}");
                warnings += 1;
                continue;
            };

            if !name.starts_with(DOTFILE_MARKER) {
                continue;
            }

            if self.exclusions.is_excluded(name) {
                debug!("exclude {name} from backup");
                continue;
            }

            match copier.copy(entry.path(), dotfiles.join(name)) {
                Ok(report) => warnings += report_copy(&report),
                Err(err) => {
                    warn_copy_failure(name, &err);
                    warnings += 1;
                }
            }
        }

        Ok(warnings)
    }

    fn stage_user_folder(&self, name: &str, staging: &Path) -> Result<usize, CategoryError> {
        let dst = staging.join(USERFILES_DIR).join(name);
        fs::create_dir_all(&dst).map_err(|err| CategoryError::Io {
            source: err,
            path: dst.clone(),
        })?;

        match self.copier(staging).copy(self.home.join(name), &dst) {
            Ok(report) => Ok(report_copy(&report)),
            Err(err) => {
                warn_copy_failure(name, &err);
                Ok(1)
            }
        }
    }

    fn copier(&self, staging: &Path) -> PathCopier {
        // INVARIANT: Dereference links, archives cannot hold them.
        PathCopier::new()
            .with_symlink_policy(SymlinkPolicy::Follow)
            .skip_path(staging)
    }
}

/// Outcome of a completed backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    /// Path to produced archive.
    pub archive: PathBuf,

    /// Number of warnings logged along the way.
    pub warnings: usize,
}

/// Remove a scratch directory, logging rather than failing.
///
/// Returns whether the directory is gone.
pub(crate) fn discard_dir(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => {
            warn!("failed to remove {:?}: {err}", path.display());
            false
        }
    }
}

/// Log entries of a copy report, returning number of warnings.
pub(crate) fn report_copy(report: &CopyReport) -> usize {
    for path in &report.skipped {
        info!("skip {:?}", path.display());
    }

    for failure in &report.failures {
        warn_copy_failure(failure.path().display(), failure);
    }

    report.failures.len()
}

/// Log a copy failure, calling out missing access rights.
pub(crate) fn warn_copy_failure(name: impl std::fmt::Display, err: &CopyError) {
    let cause = std::error::Error::source(err)
        .map(|source| format!(": {source}"))
        .unwrap_or_default();

    if err.is_permission_denied() {
        warn!("permission denied for {name}, {err}{cause}");
    } else {
        warn!("failed to copy {name}, {err}{cause}");
    }
}

fn report_archive(report: &WriteReport) -> usize {
    for path in &report.skipped {
        info!("skip non-regular file {:?}", path.display());
    }

    for failure in &report.failures {
        warn!("{failure}: {}", failure.source);
    }

    report.failures.len()
}

/// Backup error types.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Staging directory cannot be created.
    #[error("failed to create staging directory {:?}", path.display())]
    CreateStaging {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Category fails as a whole.
    #[error("failed to back up {category}")]
    Category {
        #[source]
        source: CategoryError,
        category: Category,
    },

    /// Archive cannot be written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Friendly result alias :3
pub type Result<T, E = BackupError> = std::result::Result<T, E>;
