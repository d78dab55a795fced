// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Backup categories.
//!
//! A __category__ is one selectable unit of backup and restore. There are
//! exactly three kinds: the package manifest produced by the package manager,
//! the collection of dotfiles at the top of the home directory, and named
//! user folders such as "Documents".
//!
//! # Staged Tree Layout
//!
//! Each category owns a fixed place inside a staged tree, and restoration
//! looks in exactly the same place:
//!
//! - Package manifest: the manifest file sits at the tree root.
//! - Dotfiles: `dotfiles/<name>` for every dotfile entry.
//! - User folders: `userfiles/<folder>/...` for every folder.

use crate::{copy::CopyError, package::PackageError};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Component, Path, PathBuf},
};

/// Staged subtree holding dotfile entries.
pub const DOTFILES_DIR: &str = "dotfiles";

/// Staged subtree holding user folders.
pub const USERFILES_DIR: &str = "userfiles";

/// Marker character that starts every dotfile name.
pub const DOTFILE_MARKER: char = '.';

/// User folders offered when none are configured.
pub const DEFAULT_USER_FOLDERS: [&str; 5] = ["Documents", "Pictures", "Downloads", "Movies", "Music"];

/// Kind of backup unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Manifest of installed packages dumped by the package manager.
    PackageManifest,

    /// Top-level home entries whose names start with a dot.
    DotfileCollection,

    /// Home subdirectory with given name.
    NamedUserFolder(String),
}

impl Display for Category {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::PackageManifest => fmt.write_str("package manifest"),
            Self::DotfileCollection => fmt.write_str("dotfiles"),
            Self::NamedUserFolder(name) => fmt.write_str(name),
        }
    }
}

impl Category {
    /// Check that a user folder names exactly one home subdirectory.
    ///
    /// # Errors
    ///
    /// - Return [`CategoryError::InvalidFolder`] if the folder name is empty,
    ///   absolute, or has more than one path component.
    pub fn validate(&self) -> Result<()> {
        let Self::NamedUserFolder(name) = self else {
            return Ok(());
        };

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(CategoryError::InvalidFolder { name: name.clone() }),
        }
    }
}

/// Category paired with operator selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCategory {
    pub category: Category,
    pub selected: bool,
}

impl BackupCategory {
    /// Construct new selected category.
    pub fn selected(category: Category) -> Self {
        Self {
            category,
            selected: true,
        }
    }

    /// Construct new unselected category.
    pub fn unselected(category: Category) -> Self {
        Self {
            category,
            selected: false,
        }
    }
}

/// Build ordered catalog of every category, all selected.
///
/// Package manifest comes first, then dotfiles, then one entry per user
/// folder in the order given.
pub fn catalog(user_folders: impl IntoIterator<Item = impl Into<String>>) -> Vec<BackupCategory> {
    let mut categories = vec![
        BackupCategory::selected(Category::PackageManifest),
        BackupCategory::selected(Category::DotfileCollection),
    ];
    categories.extend(
        user_folders
            .into_iter()
            .map(|name| BackupCategory::selected(Category::NamedUserFolder(name.into()))),
    );

    categories
}

/// Build catalog with [`DEFAULT_USER_FOLDERS`].
pub fn default_catalog() -> Vec<BackupCategory> {
    catalog(DEFAULT_USER_FOLDERS)
}

/// Category-level failure types.
///
/// Any of these aborts the backup or restore run it happens in.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// Package manager invocation fails.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Category subtree cannot be created or listed.
    #[error("failed to access {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Top-level copy of category content fails.
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// User folder name does not name a single home subdirectory.
    #[error("user folder {name:?} must be a single directory name")]
    InvalidFolder { name: String },
}

/// Friendly result alias :3
pub type Result<T, E = CategoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_catalog_order() {
        let labels = default_catalog()
            .into_iter()
            .map(|item| {
                assert!(item.selected);
                item.category.to_string()
            })
            .collect::<Vec<_>>();

        assert_eq!(
            labels,
            vec![
                "package manifest",
                "dotfiles",
                "Documents",
                "Pictures",
                "Downloads",
                "Movies",
                "Music",
            ]
        );
    }

    #[test]
    fn user_folder_validation() {
        assert!(Category::NamedUserFolder("Documents".into()).validate().is_ok());
        assert!(Category::DotfileCollection.validate().is_ok());

        for bad in ["", "../etc", "/etc", "Documents/Work", "."] {
            let result = Category::NamedUserFolder(bad.into()).validate();
            assert!(
                matches!(result, Err(CategoryError::InvalidFolder { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
