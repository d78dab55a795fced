// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Entry exclusion rules.
//!
//! Exclusion is literal: a top-level home entry is left out if and only if its
//! exact name is in the set. There is no case folding, no normalization, and
//! no glob matching.
//!
//! Backup and restore keep separate sets. The backup set always carries a
//! small built-in default of entries that never make sense to migrate, while
//! the restore set accepts names with or without their leading dot.

use std::collections::HashSet;

/// Entries never worth carrying to another machine.
pub const DEFAULT_BACKUP_EXCLUSIONS: [&str; 3] = [".CFUserTextEncoding", ".Trash", ".DS_Store"];

/// Set of literal entry names to leave out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    /// Construct exclusion set from exact names.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Construct backup-time exclusion set.
    ///
    /// Merges given names with [`DEFAULT_BACKUP_EXCLUSIONS`].
    pub fn for_backup(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = Self::new(names);
        set.names
            .extend(DEFAULT_BACKUP_EXCLUSIONS.iter().map(ToString::to_string));
        set
    }

    /// Construct restore-time exclusion set.
    ///
    /// Every name is registered both with and without a leading dot, so
    /// "vimrc" and ".vimrc" exclude the same entry.
    pub fn for_restore(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = Self::default();
        for name in names {
            let name = name.into();
            let bare = name.strip_prefix('.').unwrap_or(&name);
            set.names.insert(format!(".{bare}"));
            set.names.insert(bare.to_string());
        }
        set
    }

    /// Check if entry name is excluded.
    pub fn is_excluded(&self, name: impl AsRef<str>) -> bool {
        self.names.contains(name.as_ref())
    }

    /// Number of names in set.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if set has no names.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_match_only() {
        let set = ExclusionSet::new([".vimrc", ".config"]);

        assert!(set.is_excluded(".vimrc"));
        assert!(!set.is_excluded(".VIMRC"));
        assert!(!set.is_excluded("vimrc"));
        assert!(!set.is_excluded(".vim*"));
        assert!(!set.is_excluded(".config/nvim"));
    }

    #[test]
    fn backup_set_merges_defaults() {
        let set = ExclusionSet::for_backup([".cache"]);

        assert_eq!(set.len(), 4);
        assert!(set.is_excluded(".cache"));
        for name in DEFAULT_BACKUP_EXCLUSIONS {
            assert!(set.is_excluded(name));
        }
    }

    #[test]
    fn restore_set_accepts_both_dot_forms() {
        let set = ExclusionSet::for_restore(["ssh", ".gnupg"]);

        assert!(set.is_excluded(".ssh"));
        assert!(set.is_excluded("ssh"));
        assert!(set.is_excluded(".gnupg"));
        assert!(set.is_excluded("gnupg"));
        assert!(!set.is_excluded(".Trash"));
    }

    #[test]
    fn restore_set_has_no_defaults() {
        let set = ExclusionSet::for_restore(Vec::<String>::new());

        assert!(set.is_empty());
    }
}
