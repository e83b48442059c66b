//! Name-indexed process dispatch.
//!
//! The registry binds string names to handlers during the export phase and is
//! invoked concurrently afterwards. Registration is append-only for the
//! process lifetime; a duplicate name is a conflict, not an overwrite, so a
//! route bound to a name can never be silently retargeted.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use crate::error::ShellError;

/// Uniform handler contract: positional JSON arguments in, JSON result out.
pub type ProcessHandler = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Dispatch table from process name to handler.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<ProcessHandler>>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a handler. Fails if the name is already taken.
    pub fn register<F>(&self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut handlers = self.inner.write().expect("process registry poisoned");
        if handlers.contains_key(&name) {
            return Err(ShellError::ProcessAlreadyRegistered { name }.into());
        }
        debug!(process = %name, "process registered");
        handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Look up `name` and call its handler with `args`.
    ///
    /// The handler runs outside the registry lock, so invocations never block
    /// each other.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value> {
        let handler = {
            let handlers = self.inner.read().expect("process registry poisoned");
            handlers
                .get(name)
                .cloned()
                .ok_or_else(|| ShellError::ProcessNotFound { name: name.to_string() })?
        };
        handler(args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().expect("process registry poisoned").contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let handlers = self.inner.read().expect("process registry poisoned");
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
