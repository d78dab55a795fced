// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Staged tree serialization.

use crate::archive::{ArchiveError, Result};

use std::{
    fs::{self, File, Metadata},
    io::{self, BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;
use zip::{result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Serialize a staged directory tree into a zip archive.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveWriter {
    compression: CompressionMethod,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }
}

impl ArchiveWriter {
    /// Construct new archive writer using deflate compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression method for stored files.
    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    /// Write everything under `root` into a new archive at `archive`.
    ///
    /// Walks `root` with directories listed before their contents, and
    /// entries of one directory in file name order. Entries that cannot be
    /// stored end up in [`WriteReport::failures`]; symbolic links and other
    /// non-regular files end up in [`WriteReport::skipped`].
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::MissingRoot`] if `root` cannot be inspected.
    /// - Return [`ArchiveError::Create`] if archive file cannot be created.
    /// - Return [`ArchiveError::Finish`] if archive cannot be finalized.
    pub fn write(&self, root: impl AsRef<Path>, archive: impl AsRef<Path>) -> Result<WriteReport> {
        let root = root.as_ref();
        let archive = archive.as_ref();

        fs::metadata(root).map_err(|err| ArchiveError::MissingRoot {
            source: err,
            path: root.to_path_buf(),
        })?;

        let file = File::create(archive).map_err(|err| ArchiveError::Create {
            source: err,
            path: archive.to_path_buf(),
        })?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut report = WriteReport::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    report.failures.push(EntryFailure {
                        path,
                        source: EntryError::Walk(err),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();
            if file_type.is_symlink() || !(file_type.is_dir() || file_type.is_file()) {
                report.skipped.push(path.to_path_buf());
                continue;
            }

            match self.write_entry(&mut zip, root, path, file_type.is_dir()) {
                Ok(()) => report.entries += 1,
                Err(err) => report.failures.push(EntryFailure {
                    path: path.to_path_buf(),
                    source: err,
                }),
            }
        }

        let mut writer = zip.finish().map_err(|err| ArchiveError::Finish {
            source: err,
            path: archive.to_path_buf(),
        })?;
        writer.flush().map_err(|err| ArchiveError::Finish {
            source: err.into(),
            path: archive.to_path_buf(),
        })?;

        Ok(report)
    }

    fn write_entry<W>(
        &self,
        zip: &mut ZipWriter<W>,
        root: &Path,
        path: &Path,
        is_dir: bool,
    ) -> Result<(), EntryError>
    where
        W: io::Write + io::Seek,
    {
        let name = entry_name(root, path)?;
        let metadata = fs::metadata(path)?;
        let options = self.options(&metadata);

        if is_dir {
            zip.add_directory(format!("{name}/"), options)?;
            return Ok(());
        }

        // INVARIANT: Open before starting the entry so unreadable files leave no trace.
        let mut reader = File::open(path)?;
        zip.start_file(name, options)?;
        if let Err(err) = io::copy(&mut reader, zip) {
            zip.abort_file()?;
            return Err(err.into());
        }

        Ok(())
    }

    fn options(&self, metadata: &Metadata) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .compression_method(self.compression)
            .large_file(metadata.len() >= u64::from(u32::MAX));

        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            options.unix_permissions(metadata.permissions().mode())
        };

        options
    }
}

/// Convert path under `root` into a "/"-separated archive entry name.
fn entry_name(root: &Path, path: &Path) -> Result<String, EntryError> {
    let relative = path.strip_prefix(root).map_err(|_| EntryError::OutsideRoot)?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or(EntryError::NonUtf8)?),
            _ => return Err(EntryError::OutsideRoot),
        }
    }

    Ok(parts.join("/"))
}

/// Outcome of an archive write that completed.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Number of stored entries, directories included.
    pub entries: usize,

    /// Entries that could not be stored.
    pub failures: Vec<EntryFailure>,

    /// Symbolic links and non-regular files that were left out.
    pub skipped: Vec<PathBuf>,
}

/// Entry left out of an archive because of an error.
#[derive(Debug, thiserror::Error)]
#[error("failed to archive {:?}", path.display())]
pub struct EntryFailure {
    pub path: PathBuf,

    #[source]
    pub source: EntryError,
}

/// Reasons an entry cannot be archived.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Directory walk failed on entry.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Entry cannot be read.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Entry cannot be stored in archive.
    #[error(transparent)]
    Zip(#[from] ZipError),

    /// Entry name is not valid UTF-8.
    #[error("path is not valid UTF-8")]
    NonUtf8,

    /// Entry does not sit below the staged tree root.
    #[error("path escapes staged tree root")]
    OutsideRoot,
}
