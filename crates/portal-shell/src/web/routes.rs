//! Route descriptors binding HTTP paths to registered process names.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;
use axum::http::Method;

use crate::error::ShellError;

/// How a request maps to the positional arguments of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgBinding {
    /// No arguments.
    None,
    /// arg[0] = request locale (query `locale`, else `Accept-Language`).
    Locale,
}

/// Binding of an HTTP method/path to a registered process name.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    pub path: String,
    pub process: String,
    pub binding: ArgBinding,
    /// Whether the HTTP layer applies the locale overlay to the result.
    pub translate_response: bool,
}

/// Dispatch table the exporter registers routes against, keyed by path.
#[derive(Clone, Default)]
pub struct RouteTable {
    inner: Arc<RwLock<BTreeMap<String, RouteDescriptor>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Fails if the path is already exported.
    pub fn register(&self, descriptor: RouteDescriptor) -> Result<()> {
        let mut routes = self.inner.write().expect("route table poisoned");
        if routes.contains_key(&descriptor.path) {
            return Err(ShellError::RouteAlreadyExported { path: descriptor.path }.into());
        }
        routes.insert(descriptor.path.clone(), descriptor);
        Ok(())
    }

    /// Snapshot of all descriptors, in path order.
    pub fn descriptors(&self) -> Vec<RouteDescriptor> {
        let routes = self.inner.read().expect("route table poisoned");
        routes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("route table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
