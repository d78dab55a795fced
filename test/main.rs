// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use homeward::{
    package::{self, PackageManager},
    Backup, BackupStore, ExclusionSet, Restore,
};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};
use tempfile::{tempdir, TempDir};

/// Manifest file name used by [`FakeManager`].
pub(crate) const MANIFEST: &str = "Brewfile";

/// Package manager that records calls instead of spawning anything.
#[derive(Debug, Default)]
pub(crate) struct FakeManager {
    pub(crate) dumps: RefCell<Vec<PathBuf>>,
    pub(crate) restores: RefCell<Vec<String>>,
}

impl PackageManager for FakeManager {
    fn manifest_name(&self) -> &str {
        MANIFEST
    }

    fn dump(&self, workdir: &Path) -> package::Result<()> {
        self.dumps.borrow_mut().push(workdir.to_path_buf());
        fs::write(workdir.join(MANIFEST), "brew \"ripgrep\"\n").map_err(|err| {
            package::PackageError::Spawn {
                source: err,
                program: "fake".into(),
            }
        })
    }

    fn restore(&self, manifest: &Path) -> package::Result<()> {
        let contents = fs::read_to_string(manifest).map_err(|err| package::PackageError::Spawn {
            source: err,
            program: "fake".into(),
        })?;
        self.restores.borrow_mut().push(contents);
        Ok(())
    }
}

/// Two machines sharing one backup store.
///
/// The old machine's home is backed up, the archive lands in the shared
/// store, and the new machine's home is restored from it.
pub(crate) struct MigrationFixture {
    _root: TempDir,
    pub(crate) old_home: PathBuf,
    pub(crate) new_home: PathBuf,
    pub(crate) store: PathBuf,
}

impl MigrationFixture {
    pub(crate) fn new() -> Result<Self> {
        let root = tempdir()?;
        let old_home = root.path().join("old");
        let new_home = root.path().join("new");
        let store = root.path().join("store");
        fs::create_dir_all(&old_home)?;
        fs::create_dir_all(&new_home)?;

        Ok(Self {
            _root: root,
            old_home,
            new_home,
            store,
        })
    }

    /// Write file into old home, creating parents as needed.
    pub(crate) fn write_old(&self, path: impl AsRef<Path>, contents: impl AsRef<str>) -> Result<()> {
        write_file(self.old_home.join(path), contents)
    }

    /// Write file into new home, creating parents as needed.
    pub(crate) fn write_new(&self, path: impl AsRef<Path>, contents: impl AsRef<str>) -> Result<()> {
        write_file(self.new_home.join(path), contents)
    }

    pub(crate) fn backup<'a>(
        &self,
        manager: &'a FakeManager,
        exclude: &[&str],
    ) -> Backup<&'a FakeManager> {
        Backup::new(
            &self.old_home,
            BackupStore::new(&self.store),
            ExclusionSet::for_backup(exclude.iter().copied()),
            manager,
        )
    }

    pub(crate) fn restore<'a>(
        &self,
        manager: &'a FakeManager,
        exclude: &[&str],
    ) -> Restore<&'a FakeManager> {
        Restore::new(
            &self.new_home,
            BackupStore::new(&self.store),
            ExclusionSet::for_restore(exclude.iter().copied()),
            manager,
        )
    }
}

fn write_file(path: PathBuf, contents: impl AsRef<str>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents.as_ref())?;

    Ok(())
}
