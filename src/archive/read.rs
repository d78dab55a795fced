// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive extraction.

use crate::archive::{ArchiveError, Result};

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};
use zip::ZipArchive;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Deserialize a zip archive back into a directory tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveReader;

impl ArchiveReader {
    /// Construct new archive reader.
    pub fn new() -> Self {
        Self
    }

    /// Extract every entry of `archive` below `dest`.
    ///
    /// Creates `dest` if needed. Parent directories of every entry are
    /// created on demand, so extraction does not depend on directory entries
    /// being listed before their contents. Regular files are truncated if
    /// they already exist. Permission bits recorded in the archive are
    /// applied to files right away, and to directories once every entry has
    /// been extracted.
    ///
    /// Symbolic link entries, which homeward never writes itself, are
    /// skipped rather than recreated.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Open`] or [`ArchiveError::Read`] if the
    ///   archive cannot be opened as a zip container.
    /// - Return [`ArchiveError::Entry`] if an entry cannot be read.
    /// - Return [`ArchiveError::UnsafeEntry`] if an entry name would escape
    ///   `dest`.
    /// - Return [`ArchiveError::Extract`] if an entry cannot be written.
    pub fn read(&self, archive: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<ReadReport> {
        let archive = archive.as_ref();
        let dest = dest.as_ref();

        let file = File::open(archive).map_err(|err| ArchiveError::Open {
            source: err,
            path: archive.to_path_buf(),
        })?;
        let mut zip = ZipArchive::new(file).map_err(|err| ArchiveError::Read {
            source: err,
            path: archive.to_path_buf(),
        })?;

        create_dir_all(dest)?;

        let mut report = ReadReport::default();
        let mut directories = Vec::new();
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|err| ArchiveError::Entry { source: err, index })?;
            let name = entry.name().to_string();
            let mode = entry.unix_mode();

            if mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
                report.skipped.push(name);
                continue;
            }

            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry { name: name.clone() })?;
            let path = dest.join(relative);

            if entry.is_dir() {
                create_dir_all(&path)?;
                directories.push((path, mode));
                report.entries += 1;
                continue;
            }

            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }

            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            let mut writer = options.open(&path).map_err(|err| ArchiveError::Extract {
                source: err,
                path: path.clone(),
            })?;
            io::copy(&mut entry, &mut writer).map_err(|err| ArchiveError::Extract {
                source: err,
                path: path.clone(),
            })?;
            set_mode(&path, mode)?;
            report.entries += 1;
        }

        // INVARIANT: Deepest directories first so read-only parents do not block children.
        for (path, mode) in directories.into_iter().rev() {
            set_mode(&path, mode)?;
        }

        Ok(report)
    }
}

/// Outcome of a completed extraction.
#[derive(Debug, Default)]
pub struct ReadReport {
    /// Number of extracted entries, directories included.
    pub entries: usize,

    /// Names of entries that were left out.
    pub skipped: Vec<String>,
}

fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| ArchiveError::Extract {
        source: err,
        path: path.to_path_buf(),
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)).map_err(|err| {
        ArchiveError::Extract {
            source: err,
            path: PathBuf::from(path),
        }
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::{write::SimpleFileOptions, ZipWriter};

    fn build_zip(path: &Path, entries: &[(&str, &str)]) -> anyhow::Result<()> {
        let mut zip = ZipWriter::new(File::create(path)?);
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default())?;
            } else {
                zip.start_file(*name, SimpleFileOptions::default())?;
                zip.write_all(body.as_bytes())?;
            }
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn missing_directory_entries_are_created() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("flat.zip");
        build_zip(&archive, &[("dotfiles/.config/git/config", "[user]\n")])?;

        let report = ArchiveReader::new().read(&archive, dir.path().join("out"))?;

        assert_eq!(report.entries, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("out/dotfiles/.config/git/config"))?,
            "[user]\n"
        );

        Ok(())
    }

    #[test]
    fn existing_files_are_truncated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("a.zip");
        let out = dir.path().join("out");
        build_zip(&archive, &[("note", "new")])?;
        fs::create_dir(&out)?;
        fs::write(out.join("note"), "old and longer")?;

        ArchiveReader::new().read(&archive, &out)?;

        assert_eq!(fs::read_to_string(out.join("note"))?, "new");

        Ok(())
    }

    #[test]
    fn escaping_entry_aborts_extraction() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("evil.zip");
        build_zip(&archive, &[("ok", "fine"), ("../escape", "gotcha")])?;

        let result = ArchiveReader::new().read(&archive, dir.path().join("out"));

        assert!(matches!(result, Err(ArchiveError::UnsafeEntry { .. })));
        assert!(!dir.path().join("escape").exists());

        Ok(())
    }

    #[test]
    fn garbage_archive_is_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("garbage.zip");
        fs::write(&archive, "this is not a zip file")?;

        let result = ArchiveReader::new().read(&archive, dir.path().join("out"));

        assert!(matches!(result, Err(ArchiveError::Read { .. })));

        Ok(())
    }
}
