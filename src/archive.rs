// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive creation and extraction.
//!
//! A staged backup tree is serialized into one portable zip archive, and read
//! back into a directory tree on the new machine.
//!
//! # Archive Layout
//!
//! Every entry is named by its path relative to the staged tree root, with
//! components joined by "/" no matter what the host uses as a separator.
//! Directories are stored as zero-length entries whose names end in "/", so
//! empty directories survive the round trip. Each entry records the unix
//! permission bits of the file or directory it came from.
//!
//! # Limitations
//!
//! Symbolic links inside a staged tree are never stored. The writer reports
//! them as skipped and moves on. Backup staging dereferences links up front
//! so nothing is lost in practice, but a tree staged by other means loses
//! its links. Sockets, devices, and other non-regular files are skipped the
//! same way.
//!
//! # Failure Tolerance
//!
//! Writing is best-effort per entry: an entry that cannot be walked, read, or
//! stored is reported and skipped. Only failing to create or finalize the
//! archive itself is an error. Reading is strict: the first entry that
//! cannot be extracted aborts extraction.

pub mod read;
pub mod write;

pub use read::{ArchiveReader, ReadReport};
pub use write::{ArchiveWriter, EntryFailure, WriteReport};

use std::path::PathBuf;
use zip::result::ZipError;

/// Archive error types.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Staged tree root is missing or cannot be inspected.
    #[error("failed to inspect staged tree at {:?}", path.display())]
    MissingRoot {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive file cannot be created.
    #[error("failed to create archive at {:?}", path.display())]
    Create {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive cannot be finalized.
    #[error("failed to finalize archive at {:?}", path.display())]
    Finish {
        #[source]
        source: ZipError,
        path: PathBuf,
    },

    /// Archive file cannot be opened.
    #[error("failed to open archive at {:?}", path.display())]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive file is not a readable zip container.
    #[error("failed to read archive at {:?}", path.display())]
    Read {
        #[source]
        source: ZipError,
        path: PathBuf,
    },

    /// Archive entry cannot be read.
    #[error("failed to read entry {index} of archive")]
    Entry {
        #[source]
        source: ZipError,
        index: usize,
    },

    /// Archive entry would land outside of extraction directory.
    #[error("refusing to extract entry {name:?} outside of destination")]
    UnsafeEntry { name: String },

    /// Archive entry cannot be written to disk.
    #[error("failed to extract into {:?}", path.display())]
    Extract {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        fs::{self, File},
        os::unix::fs::{symlink, PermissionsExt},
        path::Path,
    };
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|index| zip.by_index(index).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn round_trip_preserves_content_and_modes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let staged = dir.path().join("staged");
        let archive = dir.path().join("staged.zip");
        let restored = dir.path().join("restored");

        fs::create_dir_all(staged.join("dotfiles/.config/nvim"))?;
        fs::create_dir_all(staged.join("userfiles/Documents/empty"))?;
        fs::write(staged.join("Brewfile"), "brew \"ripgrep\"\n")?;
        fs::write(staged.join("dotfiles/.config/nvim/init.lua"), "vim.o.number = true\n")?;
        fs::write(staged.join("dotfiles/.profile"), "export EDITOR=nvim\n")?;
        fs::write(staged.join("userfiles/Documents/blob.bin"), [0u8, 159, 146, 150, 255])?;
        fs::set_permissions(staged.join("dotfiles/.profile"), fs::Permissions::from_mode(0o600))?;
        fs::set_permissions(staged.join("Brewfile"), fs::Permissions::from_mode(0o755))?;
        fs::set_permissions(staged.join("dotfiles/.config"), fs::Permissions::from_mode(0o700))?;
        symlink("Brewfile", staged.join("root-link"))?;
        symlink(".profile", staged.join("dotfiles/inner-link"))?;

        let written = ArchiveWriter::new().write(&staged, &archive)?;
        assert!(written.failures.is_empty());
        assert_eq!(
            written.skipped,
            vec![staged.join("dotfiles/inner-link"), staged.join("root-link")]
        );

        ArchiveReader::new().read(&archive, &restored)?;

        assert_eq!(fs::read(restored.join("Brewfile"))?, b"brew \"ripgrep\"\n");
        assert_eq!(
            fs::read_to_string(restored.join("dotfiles/.config/nvim/init.lua"))?,
            "vim.o.number = true\n"
        );
        assert_eq!(
            fs::read(restored.join("userfiles/Documents/blob.bin"))?,
            vec![0u8, 159, 146, 150, 255]
        );
        assert!(restored.join("userfiles/Documents/empty").is_dir());
        assert_eq!(mode(&restored.join("dotfiles/.profile")), 0o600);
        assert_eq!(mode(&restored.join("Brewfile")), 0o755);
        assert_eq!(mode(&restored.join("dotfiles/.config")), 0o700);

        // Symlinks never make it into the archive.
        assert!(fs::symlink_metadata(restored.join("root-link")).is_err());
        assert!(fs::symlink_metadata(restored.join("dotfiles/inner-link")).is_err());

        Ok(())
    }

    #[test]
    fn entry_names_are_relative_and_slash_separated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let staged = dir.path().join("staged");
        let archive = dir.path().join("out.zip");
        fs::create_dir_all(staged.join("dotfiles/.ssh"))?;
        fs::write(staged.join("dotfiles/.ssh/config"), "Host *\n")?;

        ArchiveWriter::new().write(&staged, &archive)?;

        assert_eq!(
            entry_names(&archive),
            vec!["dotfiles/", "dotfiles/.ssh/", "dotfiles/.ssh/config"]
        );

        Ok(())
    }

    #[test]
    fn empty_tree_makes_empty_archive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let staged = dir.path().join("staged");
        let archive = dir.path().join("out.zip");
        let restored = dir.path().join("restored");
        fs::create_dir(&staged)?;

        let report = ArchiveWriter::new().write(&staged, &archive)?;
        assert_eq!(report.entries, 0);
        assert!(entry_names(&archive).is_empty());

        let report = ArchiveReader::new().read(&archive, &restored)?;
        assert_eq!(report.entries, 0);
        assert!(restored.is_dir());

        Ok(())
    }

    #[test]
    fn missing_root_is_error() {
        let dir = tempdir().unwrap();
        let result = ArchiveWriter::new().write(dir.path().join("nope"), dir.path().join("x.zip"));

        assert!(matches!(result, Err(ArchiveError::MissingRoot { .. })));
        assert!(!dir.path().join("x.zip").exists());
    }

    #[test]
    fn unwritable_destination_is_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("staged"))?;
        let result = ArchiveWriter::new().write(
            dir.path().join("staged"),
            dir.path().join("no/such/dir/out.zip"),
        );

        assert!(matches!(result, Err(ArchiveError::Create { .. })));

        Ok(())
    }
}
