//! Filesystem layout helpers for portal-shell.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::error::ShellError;

/// Environment variable that overrides the default root directory.
const ROOT_ENV_KEY: &str = "PORTAL_SHELL_ROOT";
const DEFAULT_ROOT_DIRNAME: &str = ".portal-shell";

/// Descriptor for the on-disk directory structure.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    config_dir: PathBuf,
    logins_dir: PathBuf,
    locales_dir: PathBuf,
    icons_dir: PathBuf,
    logs_dir: PathBuf,
}

impl Layout {
    /// Construct a new layout without touching the filesystem.
    pub fn new(root: PathBuf) -> Self {
        let config_dir = root.join("config");
        let logins_dir = config_dir.join("logins");
        let locales_dir = root.join("locales");
        let icons_dir = root.join("icons");
        let logs_dir = root.join("logs");

        Self { root, config_dir, logins_dir, locales_dir, icons_dir, logs_dir }
    }

    /// Ensure that all directories exist on disk.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.root(),
            self.config_dir(),
            self.logins_dir(),
            self.locales_dir(),
            self.icons_dir(),
            self.logs_dir(),
        ] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| ShellError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Top-level config directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory holding the per-role login descriptors.
    pub fn logins_dir(&self) -> &Path {
        &self.logins_dir
    }

    /// Directory holding one translation table per locale.
    pub fn locales_dir(&self) -> &Path {
        &self.locales_dir
    }

    /// Directory the icon library serves from.
    pub fn icons_dir(&self) -> &Path {
        &self.icons_dir
    }

    /// Directory that stores aggregated logs.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Settings document candidates, in lookup order.
    pub fn app_config_candidates(&self) -> [PathBuf; 2] {
        [self.config_dir().join("app.toml"), self.config_dir().join("app.json")]
    }

    /// Path to a login descriptor by role name.
    pub fn login_config_path(&self, role: &str) -> PathBuf {
        self.logins_dir().join(format!("{role}.toml"))
    }

    /// Path to a locale table by locale tag.
    pub fn locale_table_path(&self, locale: &str) -> PathBuf {
        self.locales_dir().join(format!("{locale}.toml"))
    }

    /// Path to an icon file by bare name.
    pub fn icon_path(&self, name: &str) -> PathBuf {
        self.icons_dir().join(name)
    }
}

/// Determine the default root directory for portal-shell.
pub fn default_root() -> Result<PathBuf> {
    if let Ok(value) = env::var(ROOT_ENV_KEY) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let home = user_home_dir().ok_or(ShellError::HomeDirectoryUnknown)?;
    Ok(home.join(DEFAULT_ROOT_DIRNAME))
}

fn user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    None
}
