//! Composition of the admin-shell bootstrap config.

use std::env;

use anyhow::Result;
use serde_json::{Value, json};

use crate::{
    i18n::{self, LocaleStore},
    login::LoginProvider,
    settings::SettingsStore,
};

use super::{API_PREFIX, APP_NAMESPACE};

const MODE_ENV_KEY: &str = "PORTAL_ENV";
const DEFAULT_MODE: &str = "production";

/// Where the shell front end persists its session token.
const TOKEN_STORAGE: &str = "localStorage";

const FAVICON_ICON: &str = "app.ico";
const LOGO_ICON: &str = "app.png";

/// URL an icon is served from through the shell's asset route.
pub fn icon_url(name: &str) -> String {
    format!("/api/{API_PREFIX}/app/icons/{name}")
}

/// Build the bootstrap config the admin shell reads on startup.
///
/// Display name and description carry the locale overlay; everything else is
/// composed from the settings document, the login descriptors, and the
/// process environment.
pub fn compose(
    store: &SettingsStore,
    locales: &LocaleStore,
    logins: &LoginProvider,
    locale: &str,
) -> Result<Value> {
    let settings = store.current()?;
    let name = i18n::translate_str(locales, locale, APP_NAMESPACE, &settings.name);
    let description = i18n::translate_str(locales, locale, APP_NAMESPACE, &settings.description);
    let mode = env::var(MODE_ENV_KEY).unwrap_or_else(|_| DEFAULT_MODE.to_string());

    let admin = logins.admin();
    let user = logins.user();

    Ok(json!({
        "apiPrefix": API_PREFIX,
        "name": name,
        "description": description,
        "mode": mode,
        "token": TOKEN_STORAGE,
        "favicon": icon_url(FAVICON_ICON),
        "logo": icon_url(LOGO_ICON),
        "optional": {
            "hideNotification": settings.optional.hide_notification,
            "hideSetting": settings.optional.hide_setting,
        },
        "login": {
            "admin": {
                "captcha": admin.captcha_url(API_PREFIX, "admin"),
                "login": admin.login_url(API_PREFIX, "admin"),
            },
            "user": {
                "captcha": user.captcha_url(API_PREFIX, "user"),
                "login": user.login_url(API_PREFIX, "user"),
            },
            "entry": {
                "admin": admin.entry.clone(),
                "user": user.entry.clone(),
            },
            "layout": {
                "cover": logins.cover(),
            },
        },
    }))
}
