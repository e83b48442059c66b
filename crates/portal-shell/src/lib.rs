//! Settings translation and dynamic export layer of the portal application shell.

pub mod app;
pub mod error;
pub mod i18n;
pub mod icons;
pub mod login;
pub mod paths;
pub mod process;
pub mod settings;

pub use error::ShellError;
pub use i18n::{LocaleProvider, LocaleStore, TRANSLATION_MARKER};
pub use icons::IconLibrary;
pub use login::LoginProvider;
pub use paths::{Layout, default_root};
pub use process::ProcessRegistry;
pub use settings::{AppSettings, SettingsStore};

// Web / HTTP 模块
pub mod web {
    pub mod http;
    pub mod routes;
}
