//! The canonical application settings document and its process-wide store.

use std::{
    fs,
    path::Path,
    sync::{Arc, OnceLock, RwLock},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use tracing::info;

use crate::{error::ShellError, paths::Layout};

/// Reference to the process that produces the application menu.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuDescriptor {
    /// Registry name of the menu-producing process.
    #[serde(default)]
    pub process: String,
    /// Positional arguments forwarded to that process.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Feature toggles the admin shell reads at bootstrap.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionalFeatures {
    #[serde(default)]
    pub hide_notification: bool,
    #[serde(default)]
    pub hide_setting: bool,
}

/// The application settings document.
///
/// String fields prefixed with the `::` translation marker are substituted by
/// the overlay engine; the stored document itself keeps the markers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// Display name. Required.
    #[serde(default)]
    pub name: String,
    /// Short name shown where space is tight.
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub description: String,
    /// Menu process reference. The process name is required.
    #[serde(default)]
    pub menu: MenuDescriptor,
    #[serde(default)]
    pub optional: OptionalFeatures,
    /// Free-form fields (icons, theme, auth endpoints) kept at arbitrary depth.
    #[serde(flatten)]
    pub extra: JsonMap<String, Value>,
}

impl AppSettings {
    /// Validate invariants (non-empty display name and menu process).
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ShellError::MissingField { field: "name" }.into());
        }
        if self.menu.process.trim().is_empty() {
            return Err(ShellError::MissingField { field: "menu.process" }.into());
        }
        Ok(())
    }

    /// Load from a TOML or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| ShellError::ReadSettings { path: path.to_path_buf(), source })?;
        let settings: AppSettings = if is_json_path(path) {
            serde_json::from_str(&content).map_err(|source| ShellError::ParseSettingsJson {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            toml_edit::de::from_str(&content).map_err(|source| ShellError::ParseSettingsToml {
                path: path.to_path_buf(),
                source,
            })?
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Handle to the single live settings document.
///
/// Cloning shares the same underlying slot. Replacement swaps the whole
/// document at once, so concurrent readers observe either the old or the new
/// document in full.
#[derive(Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Option<Arc<AppSettings>>>>,
}

static GLOBAL: OnceLock<SettingsStore> = OnceLock::new();

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide store instance.
    pub fn global() -> SettingsStore {
        GLOBAL.get_or_init(SettingsStore::new).clone()
    }

    /// Load the settings document from the workspace and make it live.
    pub fn load(&self, layout: &Layout) -> Result<()> {
        for candidate in layout.app_config_candidates() {
            if candidate.exists() {
                let settings = AppSettings::from_file(&candidate)?;
                info!(path = %candidate.display(), name = %settings.name, "settings loaded");
                self.replace(settings);
                return Ok(());
            }
        }
        Err(ShellError::SettingsFileMissing { dir: layout.config_dir().to_path_buf() }.into())
    }

    /// Atomically replace the live document.
    pub fn replace(&self, settings: AppSettings) {
        let mut slot = self.inner.write().expect("settings store poisoned");
        *slot = Some(Arc::new(settings));
    }

    /// Snapshot of the live document. Fails before the first `load`.
    pub fn current(&self) -> Result<Arc<AppSettings>> {
        let slot = self.inner.read().expect("settings store poisoned");
        slot.clone().ok_or_else(|| ShellError::SettingsNotLoaded.into())
    }

    /// Whether a document has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.inner.read().expect("settings store poisoned").is_some()
    }
}

fn is_json_path(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("json"))
}
