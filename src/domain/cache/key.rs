//! Cache key generation

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Namespace used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "taskboard_cache";

/// Parameters for cache key generation
///
/// Components live in a sorted map, so insertion order never affects the
/// generated key. Adding the same component twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeyParams {
    /// Logical name of the cached item (e.g. `task_42`, `user_tasks_all`)
    pub name: String,
    /// Parameter components, sorted by name
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters for a logical name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Adds every component from an iterator of pairs
    pub fn with_components<I, K, V>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in components {
            self.components.insert(k.into(), v.into());
        }
        self
    }
}

/// Builds namespaced cache keys
///
/// Keys have the form `prefix:name` or, when parameters are present,
/// `prefix:name:<hash>` where the hash is the first 128 bits of SHA-256 over
/// the canonical (sorted JSON) encoding of the parameters.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeyBuilder {
    /// Creates a key builder for the given namespace
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the namespace
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generates a key for a name without parameters
    pub fn generate_key(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }

    /// Generates a key from a name and its parameters
    pub fn generate(&self, params: &CacheKeyParams) -> String {
        let base = self.generate_key(&params.name);

        if params.components.is_empty() {
            return base;
        }

        format!("{}:{}", base, Self::digest(&params.components))
    }

    /// Glob pattern matching every key in this namespace
    pub fn namespace_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    fn digest(components: &BTreeMap<String, String>) -> String {
        // Serializing a map of strings cannot fail
        let canonical = serde_json::to_string(components).unwrap_or_default();
        let hash = Sha256::digest(canonical.as_bytes());
        hex::encode(&hash[..16])
    }
}
