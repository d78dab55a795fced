// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Selective home directory migration.
//!
//! Homeward snapshots the parts of a home directory worth carrying to a new
//! workstation into a single archive: a package manifest dumped by the
//! package manager, the dotfiles at the top of the home directory, and a
//! handful of user folders. On the new machine the most recent archive is
//! unpacked and each category found inside is put back in place.
//!
//! # Flow
//!
//! Backup: [`Backup`] stages each selected [`Category`] into a staging
//! directory with [`PathCopier`], filtering dotfiles through an
//! [`ExclusionSet`], then serializes the staging directory with
//! [`ArchiveWriter`].
//!
//! Restore: [`Restore`] locates the latest archive in the [`BackupStore`],
//! extracts it with [`ArchiveReader`], and copies each category back into the
//! home directory, again filtering dotfiles through an [`ExclusionSet`].

pub mod archive;
pub mod backup;
pub mod category;
pub mod config;
pub mod copy;
pub mod exclude;
pub mod package;
pub mod path;
pub mod restore;
pub mod store;

pub use archive::{ArchiveError, ArchiveReader, ArchiveWriter};
pub use backup::{Backup, BackupError, BackupSummary};
pub use category::{catalog, default_catalog, BackupCategory, Category, CategoryError};
pub use config::{ConfigError, Settings};
pub use copy::{CopyError, CopyReport, PathCopier, SymlinkPolicy};
pub use exclude::ExclusionSet;
pub use package::{CommandPackageManager, PackageError, PackageManager};
pub use path::{default_config_path, default_store_dir, home_dir, NoWayHome};
pub use restore::{Restore, RestoreError, RestoreSummary};
pub use store::{BackupStore, StoreError};
