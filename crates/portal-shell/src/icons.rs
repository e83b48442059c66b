//! Icon asset loader backed by the workspace icons directory.

use std::fs;

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{error::ShellError, paths::Layout};

/// Resolves icon names to encoded byte content.
#[derive(Clone, Debug)]
pub struct IconLibrary {
    layout: Layout,
}

impl IconLibrary {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Read `name` from the icons directory and return its bytes as base64.
    ///
    /// Only bare file names resolve; anything that would escape the icons
    /// directory is treated as not found.
    pub fn resolve(&self, name: &str) -> Result<String> {
        if !is_bare_file_name(name) {
            return Err(ShellError::IconNotFound { name: name.to_string() }.into());
        }

        let path = self.layout.icon_path(name);
        if !path.is_file() {
            return Err(ShellError::IconNotFound { name: name.to_string() }.into());
        }

        let bytes =
            fs::read(&path).map_err(|source| ShellError::ReadIcon { path: path.clone(), source })?;
        Ok(STANDARD.encode(bytes))
    }
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
