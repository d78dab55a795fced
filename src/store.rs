// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Backup store management.
//!
//! Homeward keeps every archive it produces in one place called the
//! __backup store__. By default this is the user's desktop, so the archive is
//! easy to find and carry to the new machine.
//!
//! # Backup Store Layout
//!
//! Only the top-level of the backup store is evaluated. Each backup is named
//! `<prefix>_<YYYYMMDDHHMMSS>`, e.g., `homeward_backup_20250102030405`. While
//! a backup is being assembled it lives in a staging directory of that name.
//! Once archived, the staging directory is replaced by a sibling archive
//! carrying a ".zip" extension. Restoration extracts the archive back into
//! a directory named after the archive without its extension.
//!
//! The most recent backup is the matching archive with the greatest
//! modification time, not the greatest timestamp in its name.

use chrono::NaiveDateTime;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Default name prefix for staging directories and archives.
pub const DEFAULT_PREFIX: &str = "homeward_backup";

/// Extension every archive in the store carries.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Timestamp layout embedded into backup names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Directory holding staged backups and archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStore {
    path: PathBuf,
    prefix: String,
}

impl BackupStore {
    /// Construct new backup store at target path using [`DEFAULT_PREFIX`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_prefix(path, DEFAULT_PREFIX)
    }

    /// Construct new backup store at target path with custom name prefix.
    pub fn with_prefix(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    /// Path to backup store directory.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Name of backup taken at given time.
    pub fn backup_name(&self, timestamp: &NaiveDateTime) -> String {
        format!("{}_{}", self.prefix, timestamp.format(TIMESTAMP_FORMAT))
    }

    /// Staging directory for backup taken at given time.
    pub fn staging_dir(&self, timestamp: &NaiveDateTime) -> PathBuf {
        self.path.join(self.backup_name(timestamp))
    }

    /// Archive path belonging to a staging directory.
    pub fn archive_path(staging_dir: impl AsRef<Path>) -> PathBuf {
        let mut path = staging_dir.as_ref().as_os_str().to_owned();
        path.push(".");
        path.push(ARCHIVE_EXTENSION);
        PathBuf::from(path)
    }

    /// Extraction directory belonging to an archive.
    pub fn extraction_dir(archive: impl AsRef<Path>) -> PathBuf {
        archive.as_ref().with_extension("")
    }

    /// Check if file name follows archive naming convention of this store.
    pub fn is_backup_archive(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix(ARCHIVE_EXTENSION))
            .is_some_and(|rest| rest.ends_with('.'))
    }

    /// Locate the most recently modified archive in the store.
    ///
    /// Ties on modification time go to whichever entry was listed first.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ReadStore`] if store directory cannot be listed.
    /// - Return [`StoreError::NoArchive`] if no entry matches the naming
    ///   convention.
    pub fn latest_archive(&self) -> Result<PathBuf> {
        let entries = fs::read_dir(&self.path).map_err(|err| StoreError::ReadStore {
            source: err,
            path: self.path.clone(),
        })?;

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.is_backup_archive(name) {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            if latest.as_ref().is_none_or(|(time, _)| modified > *time) {
                latest = Some((modified, entry.path()));
            }
        }

        latest
            .map(|(_, path)| path)
            .ok_or_else(|| StoreError::NoArchive {
                path: self.path.clone(),
            })
    }
}

/// All possible error types for backup store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backup store directory cannot be listed.
    #[error("failed to read backup store at {:?}", path.display())]
    ReadStore {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// No archive in the backup store matches the naming convention.
    #[error("no backup archive found in {:?}", path.display())]
    NoArchive { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::{
        fs::File,
        time::{Duration, UNIX_EPOCH},
    };
    use tempfile::tempdir;

    fn touch(path: &Path, secs: u64) -> anyhow::Result<()> {
        let file = File::create(path)?;
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))?;
        Ok(())
    }

    #[test]
    fn backup_naming() {
        let store = BackupStore::new("/home/blah/Desktop");
        let timestamp = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();

        let staging = store.staging_dir(&timestamp);
        assert_eq!(
            staging,
            PathBuf::from("/home/blah/Desktop/homeward_backup_20250102030405")
        );

        let archive = BackupStore::archive_path(&staging);
        assert_eq!(
            archive,
            PathBuf::from("/home/blah/Desktop/homeward_backup_20250102030405.zip")
        );
        assert_eq!(BackupStore::extraction_dir(&archive), staging);
    }

    #[test]
    fn archive_name_matching() {
        let store = BackupStore::new("/tmp");

        assert!(store.is_backup_archive("homeward_backup_20250102030405.zip"));
        assert!(!store.is_backup_archive("homeward_backup_20250102030405"));
        assert!(!store.is_backup_archive("homeward_backup_20250102030405.tar"));
        assert!(!store.is_backup_archive("other_backup_20250102030405.zip"));
        assert!(!store.is_backup_archive("homeward_backupzip"));
    }

    #[test]
    fn latest_archive_by_modification_time() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = BackupStore::new(dir.path());

        // Names deliberately disagree with modification times.
        touch(&dir.path().join("homeward_backup_20250103000000.zip"), 1_000)?;
        touch(&dir.path().join("homeward_backup_20250101000000.zip"), 3_000)?;
        touch(&dir.path().join("homeward_backup_20250102000000.zip"), 2_000)?;
        touch(&dir.path().join("unrelated.zip"), 9_000)?;
        fs::create_dir(dir.path().join("homeward_backup_20250104000000.zip"))?;

        let latest = store.latest_archive()?;
        assert_eq!(
            latest,
            dir.path().join("homeward_backup_20250101000000.zip")
        );

        Ok(())
    }

    #[test]
    fn latest_archive_missing() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = BackupStore::new(dir.path());
        touch(&dir.path().join("notes.txt"), 1_000)?;

        let result = store.latest_archive();
        assert!(matches!(result, Err(StoreError::NoArchive { .. })));

        Ok(())
    }
}
