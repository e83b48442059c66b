use std::{io, path::PathBuf};

use serde_json::Error as JsonError;
use thiserror::Error;
use toml_edit::de::Error as TomlDeError;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("application settings have not been loaded")]
    SettingsNotLoaded,

    #[error("no settings document (app.toml or app.json) under {dir}")]
    SettingsFileMissing { dir: PathBuf },

    #[error("failed to read settings file {path}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse TOML settings file {path}")]
    ParseSettingsToml {
        path: PathBuf,
        #[source]
        source: TomlDeError,
    },

    #[error("failed to parse JSON settings file {path}")]
    ParseSettingsJson {
        path: PathBuf,
        #[source]
        source: JsonError,
    },

    #[error("required settings field '{field}' is missing or empty")]
    MissingField { field: &'static str },

    #[error("failed to read locale table {path}")]
    ReadLocale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse locale table {path}")]
    ParseLocale {
        path: PathBuf,
        #[source]
        source: TomlDeError,
    },

    #[error("failed to read login config {path}")]
    ReadLogin {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse login config {path}")]
    ParseLogin {
        path: PathBuf,
        #[source]
        source: TomlDeError,
    },

    #[error("process '{name}' not found")]
    ProcessNotFound { name: String },

    #[error("process '{name}' is already registered")]
    ProcessAlreadyRegistered { name: String },

    #[error("route '{path}' is already exported")]
    RouteAlreadyExported { path: String },

    #[error("icon '{name}' not found")]
    IconNotFound { name: String },

    #[error("failed to read icon {path}")]
    ReadIcon {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("translated document no longer fits its declared shape")]
    TranslateShape {
        #[source]
        source: JsonError,
    },

    #[error("failed to create directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to determine user home directory for PORTAL_SHELL_ROOT")]
    HomeDirectoryUnknown,
}
