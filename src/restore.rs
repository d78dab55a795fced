// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Restore orchestration.
//!
//! A restore picks the most recent archive in the backup store, extracts it
//! next to itself, and puts every category found inside back into the home
//! directory. Categories are checked independently, so an archive holding only
//! dotfiles restores only dotfiles.
//!
//! # Replace Versus Merge
//!
//! Dotfiles are replaced: whatever sits at `$HOME/<name>` is removed before
//! the backed up entry is copied over. User folders are merged into whatever
//! already exists at `$HOME/<folder>`.
//!
//! # Severity
//!
//! Missing archives, unreadable archives, and a failing package manager abort
//! the run. Failing to restore one entry only logs a warning, with permission
//! problems called out separately.

use crate::{
    archive::{ArchiveError, ArchiveReader},
    backup::{discard_dir, report_copy, warn_copy_failure},
    category::{Category, CategoryError, DOTFILES_DIR, USERFILES_DIR},
    copy::PathCopier,
    exclude::ExclusionSet,
    package::{CommandPackageManager, PackageManager},
    store::{BackupStore, StoreError},
};

use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Restore orchestrator.
#[derive(Debug)]
pub struct Restore<P = CommandPackageManager>
where
    P: PackageManager,
{
    home: PathBuf,
    store: BackupStore,
    exclusions: ExclusionSet,
    package_manager: P,
    keep_archive: bool,
}

impl<P> Restore<P>
where
    P: PackageManager,
{
    /// Construct new restore orchestrator.
    ///
    /// The exclusion set is used as-is, so callers wanting names to match
    /// with or without their leading dot should build it through
    /// [`ExclusionSet::for_restore`].
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
            keep_archive: false,
        }
    }

    /// Keep archive in backup store after restoring from it.
    pub fn keep_archive(mut self, keep: bool) -> Self {
        self.keep_archive = keep;
        self
    }

    /// Restore from the most recent archive in the backup store.
    ///
    /// # Errors
    ///
    /// - Return [`RestoreError::Store`] if no archive can be found.
    /// - Return [`RestoreError::Archive`] if archive cannot be extracted.
    /// - Return [`RestoreError::Category`] if a category fails as a whole.
    /// - Return [`RestoreError::UserFolders`] if staged user folders cannot
    ///   be listed.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self) -> Result<RestoreSummary> {
        let archive = self.store.latest_archive()?;
        let extracted = BackupStore::extraction_dir(&archive);
        info!("restore from {:?}", archive.display());

        let restored = self.restore_extracted(&archive, &extracted);

        // INVARIANT: Extracted tree never outlives the run, even a failed one.
        let cleaned = discard_dir(&extracted);
        let mut summary = restored?;
        if !cleaned {
            summary.warnings += 1;
        }

        if !self.keep_archive {
            if let Err(err) = fs::remove_file(&archive) {
                warn!("failed to remove archive {:?}: {err}", archive.display());
                summary.warnings += 1;
            }
        }

        Ok(summary)
    }

    fn restore_extracted(&self, archive: &Path, extracted: &Path) -> Result<RestoreSummary> {
        let report = ArchiveReader::new().read(archive, extracted)?;
        for name in &report.skipped {
            info!("skip archive entry {name:?}");
        }

        let mut summary = RestoreSummary {
            archive: archive.to_path_buf(),
            restored: Vec::new(),
            warnings: 0,
        };

        let manifest = extracted.join(self.package_manager.manifest_name());
        if manifest.is_file() {
            info!("restore {}", Category::PackageManifest);
            self.package_manager
                .restore(&manifest)
                .map_err(|err| RestoreError::Category {
                    source: err.into(),
                    category: Category::PackageManifest,
                })?;
            summary.restored.push(Category::PackageManifest);
        }

        let dotfiles = extracted.join(DOTFILES_DIR);
        if dotfiles.is_dir() {
            info!("restore {}", Category::DotfileCollection);
            summary.warnings += self.restore_dotfiles(&dotfiles).map_err(|err| {
                RestoreError::Category {
                    source: err,
                    category: Category::DotfileCollection,
                }
            })?;
            summary.restored.push(Category::DotfileCollection);
        }

        let userfiles = extracted.join(USERFILES_DIR);
        if userfiles.is_dir() {
            let (folders, warnings) = self
                .restore_user_folders(&userfiles)
                .map_err(|err| RestoreError::UserFolders { source: err })?;
            summary.restored.extend(folders);
            summary.warnings += warnings;
        }

        Ok(summary)
    }

    fn restore_dotfiles(&self, dotfiles: &Path) -> Result<usize, CategoryError> {
        let entries = fs::read_dir(dotfiles).map_err(|err| CategoryError::Io {
            source: err,
            path: dotfiles.to_path_buf(),
        })?;

        let copier = PathCopier::new();
        let mut warnings = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("failed to list entry of {:?}: {err}", dotfiles.display());
                    warnings += 1;
                    continue;
                }
            };
            let name = entry.file_name();
            let label = name.to_string_lossy();

            if self.exclusions.is_excluded(&label) {
                info!("{label} excluded from restore");
                continue;
            }

            let dst = self.home.join(&name);
            if let Err(err) = remove_existing(&dst) {
                warn!("failed to remove {:?}: {err}", dst.display());
                warnings += 1;
            }

            match copier.copy(entry.path(), &dst) {
                Ok(report) => warnings += report_copy(&report),
                Err(err) => {
                    warn_copy_failure(&label, &err);
                    warnings += 1;
                }
            }
        }

        Ok(warnings)
    }

    fn restore_user_folders(
        &self,
        userfiles: &Path,
    ) -> Result<(Vec<Category>, usize), CategoryError> {
        let entries = fs::read_dir(userfiles).map_err(|err| CategoryError::Io {
            source: err,
            path: userfiles.to_path_buf(),
        })?;

        let copier = PathCopier::new();
        let mut folders = Vec::new();
        let mut warnings = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let category = Category::NamedUserFolder(name.to_string_lossy().into_owned());
            info!("restore {category}");

            match copier.copy(entry.path(), self.home.join(&name)) {
                Ok(report) => warnings += report_copy(&report),
                Err(err) => {
                    warn_copy_failure(&category, &err);
                    warnings += 1;
                }
            }
            folders.push(category);
        }

        Ok((folders, warnings))
    }
}

/// Remove whatever sits at a path, without following symbolic links.
fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Archive restored from.
    pub archive: PathBuf,

    /// Categories found and restored, in order.
    pub restored: Vec<Category>,

    /// Number of warnings logged along the way.
    pub warnings: usize,
}

/// Restore error types.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// No usable archive in backup store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Archive cannot be extracted.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Category fails as a whole.
    #[error("failed to restore {category}")]
    Category {
        #[source]
        source: CategoryError,
        category: Category,
    },

    /// Staged user folders cannot be listed.
    #[error("failed to restore user folders")]
    UserFolders {
        #[source]
        source: CategoryError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RestoreError> = std::result::Result<T, E>;
