// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Recursive path mirroring.
//!
//! Mirror a source path onto a destination path while keeping symbolic links,
//! regular file bytes, and permission bits intact.
//!
//! # Failure Tolerance
//!
//! Copying is best-effort below the top-level path. A failure on the path
//! handed to [`PathCopier::copy`] itself is returned as an error, but any
//! failure deeper in a directory tree is collected into a [`CopyReport`] and
//! the traversal moves on to the next sibling. A partially copied subtree is
//! an accepted end state. The copier never logs anything itself. Callers
//! decide how loudly to report what ended up in the report.
//!
//! # Symbolic Links
//!
//! By default a symbolic link is recreated at the destination with the same
//! target string, without checking whether that target resolves. Callers can
//! opt into [`SymlinkPolicy::Follow`] to copy whatever a link points to
//! instead. Following links guards against cycles by tracking the canonical
//! path of every directory on the current descent.

use std::{
    fs::{self, File, Metadata, OpenOptions},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// How symbolic links met during a copy are treated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkPolicy {
    /// Recreate the link itself at the destination.
    #[default]
    Preserve,

    /// Copy whatever the link resolves to.
    Follow,
}

/// Recursive copier for files, directories, and symbolic links.
#[derive(Debug, Default, Clone)]
pub struct PathCopier {
    symlinks: SymlinkPolicy,
    skip: Vec<PathBuf>,
    skip_canonical: Vec<PathBuf>,
}

impl PathCopier {
    /// Construct new copier that preserves symbolic links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how symbolic links are treated.
    pub fn with_symlink_policy(mut self, policy: SymlinkPolicy) -> Self {
        self.symlinks = policy;
        self
    }

    /// Never descend into or copy a given source path.
    ///
    /// Matching is done on the path as it is built during traversal, i.e.,
    /// the top-level source joined with entry names. When following links,
    /// directories are also matched by canonical path, so a link leading into
    /// a skipped path is caught too. The canonical form is resolved here, so
    /// the path should already exist.
    pub fn skip_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Ok(canonical) = fs::canonicalize(&path) {
            self.skip_canonical.push(canonical);
        }
        self.skip.push(path);
        self
    }

    /// Mirror `src` onto `dst`.
    ///
    /// Creates entries at `dst`, but never removes anything already there
    /// except for truncating a same-named regular file.
    ///
    /// # Errors
    ///
    /// - Return [`CopyError`] if the top-level source cannot be inspected,
    ///   or if copying the top-level entry itself fails. Failures on nested
    ///   entries are recorded in the returned [`CopyReport`] instead.
    pub fn copy(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<CopyReport> {
        let mut report = CopyReport::default();
        let mut ancestors = Vec::new();
        let task = self.inspect(src.as_ref().to_path_buf(), dst.as_ref().to_path_buf())?;
        self.copy_task(task, &mut report, &mut ancestors)?;

        Ok(report)
    }

    fn inspect(&self, src: PathBuf, dst: PathBuf) -> Result<CopyTask> {
        let mut metadata = fs::symlink_metadata(&src).map_err(|err| CopyError::Inspect {
            source: err,
            path: src.clone(),
        })?;

        if metadata.file_type().is_symlink() && self.symlinks == SymlinkPolicy::Follow {
            metadata = fs::metadata(&src).map_err(|err| CopyError::Inspect {
                source: err,
                path: src.clone(),
            })?;
        }

        Ok(CopyTask {
            kind: EntryKind::of(&metadata),
            src,
            dst,
            metadata,
        })
    }

    fn copy_task(
        &self,
        task: CopyTask,
        report: &mut CopyReport,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if self.skip.iter().any(|path| path == &task.src) {
            report.skipped.push(task.src);
            return Ok(());
        }

        match task.kind {
            EntryKind::Symlink => copy_symlink(&task.src, &task.dst)?,
            EntryKind::Directory => self.copy_dir(task, report, ancestors)?,
            EntryKind::File => copy_file(&task.src, &task.dst, &task.metadata)?,
            EntryKind::Other => report.skipped.push(task.src),
        }

        Ok(())
    }

    fn copy_dir(
        &self,
        task: CopyTask,
        report: &mut CopyReport,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<()> {
        // INVARIANT: Only followed links can lead back into an ancestor.
        let canonical = match self.symlinks {
            SymlinkPolicy::Follow => {
                let canonical = fs::canonicalize(&task.src).map_err(|err| CopyError::Inspect {
                    source: err,
                    path: task.src.clone(),
                })?;
                if self.skip_canonical.contains(&canonical) {
                    report.skipped.push(task.src);
                    return Ok(());
                }
                if ancestors.contains(&canonical) {
                    return Err(CopyError::Cycle { path: task.src });
                }
                Some(canonical)
            }
            SymlinkPolicy::Preserve => None,
        };

        fs::create_dir_all(&task.dst).map_err(|err| CopyError::CreateDir {
            source: err,
            path: task.dst.clone(),
        })?;

        let entries = fs::read_dir(&task.src).map_err(|err| CopyError::ReadDir {
            source: err,
            path: task.src.clone(),
        })?;

        if let Some(canonical) = canonical {
            ancestors.push(canonical);
        }

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    report.failures.push(CopyError::ReadDir {
                        source: err,
                        path: task.src.clone(),
                    });
                    continue;
                }
            };

            let name = entry.file_name();
            let child = self
                .inspect(task.src.join(&name), task.dst.join(&name))
                .and_then(|child| self.copy_task(child, report, ancestors));
            if let Err(err) = child {
                report.failures.push(err);
            }
        }

        if self.symlinks == SymlinkPolicy::Follow {
            ancestors.pop();
        }

        // INVARIANT: Apply directory mode last so read-only directories can be filled.
        fs::set_permissions(&task.dst, task.metadata.permissions()).map_err(|err| {
            CopyError::SetPermissions {
                source: err,
                path: task.dst.clone(),
            }
        })?;

        Ok(())
    }
}

/// Outcome of a copy that completed at the top level.
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Nested entries that could not be copied.
    pub failures: Vec<CopyError>,

    /// Source entries left alone, e.g., sockets, devices, or skipped paths.
    pub skipped: Vec<PathBuf>,
}

impl CopyReport {
    /// Check if every nested entry was copied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An in-flight copy of one source entry.
#[derive(Debug)]
struct CopyTask {
    src: PathBuf,
    dst: PathBuf,
    kind: EntryKind,
    metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    Symlink,
    File,
    Other,
}

impl EntryKind {
    fn of(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|err| CopyError::ReadLink {
        source: err,
        path: src.to_path_buf(),
    })?;

    make_symlink(&target, dst).map_err(|err| CopyError::CreateSymlink {
        source: err,
        path: dst.to_path_buf(),
    })
}

fn copy_file(src: &Path, dst: &Path, metadata: &Metadata) -> Result<()> {
    let mut reader = File::open(src).map_err(|err| CopyError::OpenSource {
        source: err,
        path: src.to_path_buf(),
    })?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(metadata.permissions().mode());
    }

    let mut writer = options.open(dst).map_err(|err| CopyError::CreateDestination {
        source: err,
        path: dst.to_path_buf(),
    })?;

    io::copy(&mut reader, &mut writer).map_err(|err| CopyError::CopyBytes {
        source: err,
        path: dst.to_path_buf(),
    })?;

    // INVARIANT: Creation mode is filtered by umask and ignored for existing files.
    fs::set_permissions(dst, metadata.permissions()).map_err(|err| CopyError::SetPermissions {
        source: err,
        path: dst.to_path_buf(),
    })
}

#[cfg(unix)]
fn make_symlink(target: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn make_symlink(target: &Path, dst: &Path) -> io::Result<()> {
    let resolved = dst.parent().map(|parent| parent.join(target));
    match resolved {
        Some(path) if path.is_dir() => std::os::windows::fs::symlink_dir(target, dst),
        _ => std::os::windows::fs::symlink_file(target, dst),
    }
}

/// Copy error types.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Source entry cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Symbolic link target cannot be read.
    #[error("failed to read symlink {:?}", path.display())]
    ReadLink {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Symbolic link cannot be created at destination.
    #[error("failed to create symlink {:?}", path.display())]
    CreateSymlink {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Destination directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Source directory cannot be listed.
    #[error("failed to read directory {:?}", path.display())]
    ReadDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Source file cannot be opened.
    #[error("failed to open {:?}", path.display())]
    OpenSource {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Destination file cannot be created or truncated.
    #[error("failed to create {:?}", path.display())]
    CreateDestination {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// File content cannot be streamed to destination.
    #[error("failed to copy content into {:?}", path.display())]
    CopyBytes {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Permission bits cannot be applied to destination.
    #[error("failed to set permissions on {:?}", path.display())]
    SetPermissions {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Followed symbolic link leads back into a directory being copied.
    #[error("symlink cycle at {:?}", path.display())]
    Cycle { path: PathBuf },
}

impl CopyError {
    /// Path the failure is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::Inspect { path, .. }
            | Self::ReadLink { path, .. }
            | Self::CreateSymlink { path, .. }
            | Self::CreateDir { path, .. }
            | Self::ReadDir { path, .. }
            | Self::OpenSource { path, .. }
            | Self::CreateDestination { path, .. }
            | Self::CopyBytes { path, .. }
            | Self::SetPermissions { path, .. }
            | Self::Cycle { path } => path,
        }
    }

    /// Check if failure came from missing access rights.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Inspect { source, .. }
            | Self::ReadLink { source, .. }
            | Self::CreateSymlink { source, .. }
            | Self::CreateDir { source, .. }
            | Self::ReadDir { source, .. }
            | Self::OpenSource { source, .. }
            | Self::CreateDestination { source, .. }
            | Self::CopyBytes { source, .. }
            | Self::SetPermissions { source, .. } => source.kind() == ErrorKind::PermissionDenied,
            Self::Cycle { .. } => false,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = CopyError> = std::result::Result<T, E>;
