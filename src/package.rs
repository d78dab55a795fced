// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External package manager integration.
//!
//! Homeward does not understand package manifests. It only knows how to ask
//! an external package manager to dump a manifest into a directory, and how
//! to hand that manifest back to it on the new machine. Both invocations are
//! opaque: the exit status is the only thing trusted.

use crate::config::PackageManagerSettings;

use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, instrument};

/// Layer of indirection for package manager access.
pub trait PackageManager {
    /// File name of manifest produced by [`PackageManager::dump`].
    fn manifest_name(&self) -> &str;

    /// Dump manifest of installed packages into target directory.
    fn dump(&self, workdir: &Path) -> Result<()>;

    /// Install packages listed in manifest.
    fn restore(&self, manifest: &Path) -> Result<()>;
}

impl<P> PackageManager for &P
where
    P: PackageManager + ?Sized,
{
    fn manifest_name(&self) -> &str {
        (**self).manifest_name()
    }

    fn dump(&self, workdir: &Path) -> Result<()> {
        (**self).dump(workdir)
    }

    fn restore(&self, manifest: &Path) -> Result<()> {
        (**self).restore(manifest)
    }
}

/// Package manager driven through a subprocess.
#[derive(Debug, Clone, Default)]
pub struct CommandPackageManager {
    settings: PackageManagerSettings,
}

impl CommandPackageManager {
    /// Construct new subprocess package manager.
    pub fn new(settings: PackageManagerSettings) -> Self {
        Self { settings }
    }

    /// Locate package manager executable.
    ///
    /// Names containing a path separator are checked directly, bare names
    /// are searched for in `PATH`.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::NotFound`] if executable cannot be found.
    pub fn locate(&self) -> Result<PathBuf> {
        find_program(&self.settings.program).ok_or_else(|| PackageError::NotFound {
            program: self.settings.program.clone(),
        })
    }
}

impl PackageManager for CommandPackageManager {
    fn manifest_name(&self) -> &str {
        &self.settings.manifest
    }

    #[instrument(skip(self), level = "debug")]
    fn dump(&self, workdir: &Path) -> Result<()> {
        let program = self.locate()?;
        let output = syscall_non_interactive(&program, &self.settings.dump_args, workdir)?;
        debug!("{output}");

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn restore(&self, manifest: &Path) -> Result<()> {
        let program = self.locate()?;
        let mut args = self
            .settings
            .restore_args
            .iter()
            .map(Into::into)
            .collect::<Vec<std::ffi::OsString>>();
        args.push(manifest.as_os_str().to_owned());

        syscall_interactive(&program, args)
    }
}

fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|path| path.is_file())
    })
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref())
        .args(args)
        .spawn()
        .map_err(|err| PackageError::Spawn {
            source: err,
            program: cmd.as_ref().to_string_lossy().into_owned(),
        })?
        .wait()
        .map_err(|err| PackageError::Spawn {
            source: err,
            program: cmd.as_ref().to_string_lossy().into_owned(),
        })?;

    if !status.success() {
        return Err(PackageError::Failed {
            program: cmd.as_ref().to_string_lossy().into_owned(),
            message: status.to_string(),
        });
    }

    Ok(())
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    workdir: &Path,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .current_dir(workdir)
        .output()
        .map_err(|err| PackageError::Spawn {
            source: err,
            program: cmd.as_ref().to_string_lossy().into_owned(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(PackageError::Failed {
            program: cmd.as_ref().to_string_lossy().into_owned(),
            message: format!("{}\n{message}", output.status),
        });
    }

    Ok(message)
}

/// Package manager error types.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Executable is not installed.
    #[error("package manager {program:?} not found")]
    NotFound { program: String },

    /// Subprocess cannot be started or waited on.
    #[error("failed to run {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Subprocess exited unsuccessfully.
    #[error("command {program:?} failed: {message}")]
    Failed { program: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = PackageError> = std::result::Result<T, E>;
