//! Binding Registry
//!
//! The registry guarantees one binding per (variable, attribute) pair. It is
//! an ordinary value: construct one per application, per session or per
//! test, and pass it to whatever builds widgets. Dropping it tears every
//! binding down.
//!
//! # Clearing
//!
//! [`BindingRegistry::clear_all`] removes every binding and cancels its
//! subscription exactly once. A propagation pass already running on a
//! removed binding finishes against that binding; only later lookups see
//! the emptied registry, and the retired binding ignores any notification
//! that still reaches it.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::{Binding, BindingKey, MapFn, Variable};
use crate::config::RegistryConfig;

/// Deduplicating store of bindings.
pub struct BindingRegistry {
    bindings: DashMap<BindingKey, Arc<Binding>>,
    config: RegistryConfig,
}

impl BindingRegistry {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            bindings: DashMap::with_capacity(config.initial_capacity),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The binding for (`variable`, `attribute`), created on first use.
    pub fn get_or_create(&self, variable: &Variable, attribute: &str) -> Arc<Binding> {
        self.resolve(variable, attribute, None)
    }

    /// Like [`get_or_create`](Self::get_or_create), with a value transform.
    ///
    /// The transform only takes effect if this call creates the binding; an
    /// existing binding keeps the transform of whoever created it.
    pub fn get_or_create_mapped(
        &self,
        variable: &Variable,
        attribute: &str,
        map: MapFn,
    ) -> Arc<Binding> {
        self.resolve(variable, attribute, Some(map))
    }

    /// One binding per variable, all under the same attribute, in order.
    pub fn get_or_create_batch(
        &self,
        variables: &[Variable],
        attribute: &str,
        map: Option<MapFn>,
    ) -> Vec<Arc<Binding>> {
        variables
            .iter()
            .map(|variable| self.resolve(variable, attribute, map.clone()))
            .collect()
    }

    fn resolve(&self, variable: &Variable, attribute: &str, map: Option<MapFn>) -> Arc<Binding> {
        let key = BindingKey::new(variable.id(), attribute);
        if let Some(existing) = self.bindings.get(&key) {
            return Arc::clone(existing.value());
        }

        // The entry lock makes racing creators agree on a single binding.
        let entry = self
            .bindings
            .entry(key.clone())
            .or_insert_with(|| Binding::install(key, variable.clone(), map));
        Arc::clone(entry.value())
    }

    /// Look up a binding without creating it.
    pub fn get(&self, key: &BindingKey) -> Option<Arc<Binding>> {
        self.bindings.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &BindingKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Remove every binding and cancel its subscription.
    ///
    /// Returns how many bindings were retired. Safe to call repeatedly.
    pub fn clear_all(&self) -> usize {
        let keys: Vec<BindingKey> = self.bindings.iter().map(|entry| entry.key().clone()).collect();

        let mut retired = 0;
        for key in keys {
            if let Some((_, binding)) = self.bindings.remove(&key) {
                if binding.retire() {
                    retired += 1;
                }
            }
        }

        debug!(retired, "registry cleared");
        retired
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingRegistry {
    fn drop(&mut self) {
        self.clear_all();
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bindings", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
