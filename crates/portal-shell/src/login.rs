//! Per-role login descriptors consumed by the xgen bootstrap config.

use std::fs;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{error::ShellError, paths::Layout};

const DEFAULT_LOGIN_COVER: &str = "/assets/images/login/cover.svg";

/// Layout assets for the login screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginLayout {
    #[serde(default)]
    pub cover: String,
}

/// Login descriptor for one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginSettings {
    /// Route the shell redirects to after a successful login.
    #[serde(default)]
    pub entry: String,
    /// Captcha endpoint override. Computed from the API prefix when absent.
    #[serde(default)]
    pub captcha: Option<String>,
    /// Login endpoint override. Computed from the API prefix when absent.
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub layout: LoginLayout,
}

impl LoginSettings {
    fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|source| ShellError::ReadLogin { path: path.to_path_buf(), source })?;
        let settings = toml_edit::de::from_str(&content)
            .map_err(|source| ShellError::ParseLogin { path: path.to_path_buf(), source })?;
        Ok(settings)
    }

    /// Captcha URL for `role`, honoring the file override.
    pub fn captcha_url(&self, api_prefix: &str, role: &str) -> String {
        match self.captcha.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!("/api/{api_prefix}/login/{role}/captcha?type=digit"),
        }
    }

    /// Login URL for `role`, honoring the file override.
    pub fn login_url(&self, api_prefix: &str, role: &str) -> String {
        match self.login.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!("/api/{api_prefix}/login/{role}"),
        }
    }
}

/// Login descriptors for both shell roles.
///
/// Files are optional; a missing role falls back to computed defaults so the
/// bootstrap config always carries a complete login block.
#[derive(Debug, Clone, Default)]
pub struct LoginProvider {
    admin: LoginSettings,
    user: LoginSettings,
}

impl LoginProvider {
    /// Load `config/logins/{admin,user}.toml` where present.
    pub fn load(layout: &Layout) -> Result<Self> {
        let mut provider = LoginProvider::default();
        for (role, slot) in [("admin", &mut provider.admin), ("user", &mut provider.user)] {
            let path = layout.login_config_path(role);
            if path.exists() {
                *slot = LoginSettings::from_file(&path)?;
            }
        }
        Ok(provider)
    }

    pub fn admin(&self) -> &LoginSettings {
        &self.admin
    }

    pub fn user(&self) -> &LoginSettings {
        &self.user
    }

    /// Cover asset shared by both roles. Admin wins, then user, then default.
    pub fn cover(&self) -> String {
        for candidate in [&self.admin.layout.cover, &self.user.layout.cover] {
            if !candidate.trim().is_empty() {
                return candidate.clone();
            }
        }
        DEFAULT_LOGIN_COVER.to_string()
    }
}
