//! # Handler Catalog
//!
//! The compile-time list of handler factories a manifest may name. A
//! factory receives the manifest's `settings` table and returns a
//! descriptor, or a [`DiscoveryError`] if the settings are unusable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{DiscoveryError, HandlerDescriptor};

pub type HandlerSettings = toml::Table;

pub type HandlerFactory =
    Arc<dyn Fn(&HandlerSettings) -> Result<HandlerDescriptor, DiscoveryError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct HandlerCatalog {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&HandlerSettings) -> Result<HandlerDescriptor, DiscoveryError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&HandlerSettings) -> Result<HandlerDescriptor, DiscoveryError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HandlerFactory> {
        self.factories.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("handlers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
