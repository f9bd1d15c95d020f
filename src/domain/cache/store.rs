//! Cache store trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Best-effort store diagnostics
///
/// Fields a driver cannot report stay `None` and are shown as "N/A".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub driver: String,
    pub tag_strategy: Option<String>,
    pub memory_usage: Option<String>,
    pub total_keys: Option<u64>,
    pub hits: Option<u64>,
    pub misses: Option<u64>,
}

impl CacheStats {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Default::default()
        }
    }

    /// Hit ratio in percent, only when both hits and misses are known
    pub fn hit_ratio(&self) -> Option<f64> {
        let (hits, misses) = (self.hits?, self.misses?);
        let total = hits + misses;

        if total == 0 {
            return Some(0.0);
        }

        Some(hits as f64 / total as f64 * 100.0)
    }
}

/// Pluggable key-value store behind the cache layer
///
/// Values are JSON strings so the trait stays dyn-compatible; typed access
/// goes through [`CacheStoreExt`]. Tag and pattern scoping are optional
/// capabilities: stores that lack them keep the default implementations,
/// which fail with [`DomainError::UnsupportedOperation`].
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Driver name reported in diagnostics and errors
    fn driver(&self) -> &'static str;

    /// Whether the store can group keys under tags natively
    fn supports_tagging(&self) -> bool {
        false
    }

    /// Whether the store can enumerate keys by glob pattern
    fn supports_pattern_scan(&self) -> bool {
        false
    }

    /// Gets a raw JSON value; `None` when absent or expired
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value with a TTL, overwriting any existing entry
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Registers a key under each of the given tags for at least `ttl`
    async fn tag_keys(
        &self,
        _tags: &[String],
        _key: &str,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        Err(DomainError::unsupported(self.driver(), "tag_keys"))
    }

    /// Deletes every key registered under any of the tags, clearing the tags
    async fn delete_by_tags(&self, _tags: &[String]) -> Result<usize, DomainError> {
        Err(DomainError::unsupported(self.driver(), "delete_by_tags"))
    }

    /// Deletes every key matching a glob pattern (`*` and `?` wildcards)
    async fn delete_pattern(&self, _pattern: &str) -> Result<usize, DomainError> {
        Err(DomainError::unsupported(self.driver(), "delete_pattern"))
    }

    /// Removes every entry in the store's namespace
    async fn clear(&self) -> Result<(), DomainError>;

    /// Returns driver-dependent statistics
    async fn stats(&self) -> Result<CacheStats, DomainError>;
}

/// Extension trait providing typed get/set operations
pub trait CacheStoreExt: CacheStore {
    /// Gets a typed value from the store
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cache value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value in the store with a TTL
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: CacheStore + ?Sized> CacheStoreExt for T {}

/// Compiles a glob pattern (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }

    expr.push('$');

    Regex::new(&expr).map_err(|e| DomainError::cache(format!("Invalid pattern: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex() {
        let regex = glob_to_regex("app:task_*").unwrap();
        assert!(regex.is_match("app:task_1"));
        assert!(regex.is_match("app:task_1_comments"));
        assert!(!regex.is_match("other:app:task_1"));

        let regex = glob_to_regex("app:user_?_comments").unwrap();
        assert!(regex.is_match("app:user_1_comments"));
        assert!(!regex.is_match("app:user_12_comments"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let regex = glob_to_regex("a.b+c").unwrap();
        assert!(regex.is_match("a.b+c"));
        assert!(!regex.is_match("axbbc"));
    }

    #[test]
    fn test_hit_ratio() {
        let mut stats = CacheStats::new("in_memory");
        assert_eq!(stats.hit_ratio(), None);

        stats.hits = Some(3);
        stats.misses = Some(1);
        assert_eq!(stats.hit_ratio(), Some(75.0));

        stats.hits = Some(0);
        stats.misses = Some(0);
        assert_eq!(stats.hit_ratio(), Some(0.0));
    }
}
