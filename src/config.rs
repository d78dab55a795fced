// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the configuration file that homeward uses to
//! simplify the process of serialization and deserialization. File I/O is
//! left to the caller to figure out.
//!
//! # General Layout
//!
//! Every section and every field is optional. Missing values fall back to
//! built-in defaults that mirror a stock macOS workstation with Homebrew.
//!
//! ```toml
//! [store]
//! path = "~/Desktop"
//! prefix = "homeward_backup"
//!
//! [package_manager]
//! program = "brew"
//! dump_args = ["bundle", "dump"]
//! restore_args = ["bundle", "--file"]
//! manifest = "Brewfile"
//!
//! [backup]
//! exclude = [".cache"]
//! user_folders = ["Documents", "Pictures"]
//!
//! [restore]
//! exclude = ["ssh"]
//! keep_archive = false
//! ```

use crate::{category::DEFAULT_USER_FOLDERS, path::NoWayHome, store::DEFAULT_PREFIX};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Top-level configuration layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where archives are kept.
    pub store: StoreSettings,

    /// External package manager invocation.
    pub package_manager: PackageManagerSettings,

    /// Backup-time behavior.
    pub backup: BackupSettings,

    /// Restore-time behavior.
    pub restore: RestoreSettings,
}

impl Settings {
    /// Resolve backup store directory.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if no path is configured and the default
    ///   cannot be determined.
    pub fn store_dir(&self) -> Result<PathBuf, NoWayHome> {
        match &self.store.path {
            Some(path) => Ok(path.as_path().to_path_buf()),
            None => crate::path::default_store_dir(),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on store path field.
        if let Some(path) = &settings.store.path {
            settings.store.path = Some(StorePath::new(
                shellexpand::full(path.to_string().as_str())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Backup store settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding archives, desktop by default.
    pub path: Option<StorePath>,

    /// Name prefix of staging directories and archives.
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            prefix: DEFAULT_PREFIX.into(),
        }
    }
}

/// External package manager settings.
///
/// Dump runs `<program> <dump_args>...` inside the staging directory and is
/// expected to leave `manifest` there. Restore runs
/// `<program> <restore_args>... <path to manifest>`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageManagerSettings {
    /// Executable name or path.
    pub program: String,

    /// Arguments that dump a manifest into working directory.
    pub dump_args: Vec<String>,

    /// Arguments that install from a manifest, manifest path appended.
    pub restore_args: Vec<String>,

    /// File name of dumped manifest.
    pub manifest: String,
}

impl Default for PackageManagerSettings {
    fn default() -> Self {
        Self {
            program: "brew".into(),
            dump_args: vec!["bundle".into(), "dump".into()],
            restore_args: vec!["bundle".into(), "--file".into()],
            manifest: "Brewfile".into(),
        }
    }
}

/// Backup settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Dotfile names to leave out, on top of built-in defaults.
    pub exclude: Vec<String>,

    /// Home subdirectories offered as user folder categories.
    pub user_folders: Vec<String>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            user_folders: DEFAULT_USER_FOLDERS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Restore settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RestoreSettings {
    /// Dotfile names to leave out, with or without leading dot.
    pub exclude: Vec<String>,

    /// Keep archive after successful restore.
    pub keep_archive: bool,
}

/// Path acting as the backup store.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct StorePath(PathBuf);

impl StorePath {
    /// Construct new store path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat store path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for StorePath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            [store]
            path = "/home/blah/Desktop"
            prefix = "pc_backup"

            [package_manager]
            program = "pacman-bundle"
            dump_args = ["dump"]
            restore_args = ["install", "--from"]
            manifest = "packages.txt"

            [backup]
            exclude = [".cache", ".npm"]
            user_folders = ["Documents", "Projects"]

            [restore]
            exclude = ["ssh"]
            keep_archive = true
        "#
        .parse()?;

        let expect = Settings {
            store: StoreSettings {
                path: Some(StorePath::new("/home/blah/Desktop")),
                prefix: "pc_backup".into(),
            },
            package_manager: PackageManagerSettings {
                program: "pacman-bundle".into(),
                dump_args: vec!["dump".into()],
                restore_args: vec!["install".into(), "--from".into()],
                manifest: "packages.txt".into(),
            },
            backup: BackupSettings {
                exclude: vec![".cache".into(), ".npm".into()],
                user_folders: vec!["Documents".into(), "Projects".into()],
            },
            restore: RestoreSettings {
                exclude: vec!["ssh".into()],
                keep_archive: true,
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_partial_settings_uses_defaults() -> anyhow::Result<()> {
        let result: Settings = r#"
            [backup]
            exclude = [".cache"]
        "#
        .parse()?;

        let expect = Settings {
            backup: BackupSettings {
                exclude: vec![".cache".into()],
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(result, expect);
        assert_eq!(result.package_manager.program, "brew");
        assert_eq!(result.store.prefix, DEFAULT_PREFIX);

        Ok(())
    }

    #[test]
    fn deserialize_rejects_bad_types() {
        let result = "[restore]\nkeep_archive = \"nope\"\n".parse::<Settings>();

        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialized_settings_parse_back() -> anyhow::Result<()> {
        let settings = Settings {
            store: StoreSettings {
                path: Some(StorePath::new("/home/blah/Desktop")),
                ..Default::default()
            },
            restore: RestoreSettings {
                exclude: vec![".ssh".into()],
                keep_archive: false,
            },
            ..Default::default()
        };

        let result: Settings = settings.to_string().parse()?;
        assert_eq!(result, settings);

        Ok(())
    }

    #[test]
    fn configured_store_dir_wins() {
        let settings = Settings {
            store: StoreSettings {
                path: Some(StorePath::new("/srv/backups")),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(settings.store_dir().unwrap(), PathBuf::from("/srv/backups"));
    }
}
