//! Cache facade - the read/write/invalidate surface used by domain services

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::cache::{
    CacheKeyParams, CacheStats, CacheStore, CacheStoreExt, KeyBuilder, TagIndex, TagSet,
};
use crate::domain::DomainError;

/// Public cache surface over a store and a tag index
///
/// `remember` is not single-flight: concurrent misses on the same key may
/// each run the producer and each store the result. Producers must be
/// idempotent reads.
#[derive(Debug, Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
    tags: Arc<dyn TagIndex>,
    keys: KeyBuilder,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, tags: Arc<dyn TagIndex>, keys: KeyBuilder) -> Self {
        Self { store, tags, keys }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn tag_index(&self) -> &Arc<dyn TagIndex> {
        &self.tags
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Namespaced key for a name without parameters
    pub fn generate_key(&self, name: &str) -> String {
        self.keys.generate_key(name)
    }

    /// Namespaced key for a name and its parameters
    pub fn generate_key_with(&self, params: &CacheKeyParams) -> String {
        self.keys.generate(params)
    }

    /// Returns the cached value, or runs `producer` and caches its result
    pub async fn remember<V, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        self.remember_with_tags(&TagSet::new(), key, ttl, producer)
            .await
    }

    /// Like [`remember`](Self::remember), registering the key under `tags` on a miss
    pub async fn remember_with_tags<V, F, Fut>(
        &self,
        tags: &TagSet,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        ensure_ttl(ttl)?;

        if let Some(value) = self.cached::<V>(key).await? {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        debug!(key, "Cache miss");
        let value = producer().await?;
        self.put_with_tags(tags, key, &value, ttl).await?;

        Ok(value)
    }

    /// Stores a value unconditionally
    pub async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<(), DomainError>
    where
        V: Serialize + Sync,
    {
        self.put_with_tags(&TagSet::new(), key, value, ttl).await
    }

    /// Stores a value and registers it under `tags`
    ///
    /// Tag linkage is written before the entry, so a concurrent tag
    /// invalidation never sees the entry without its tags.
    pub async fn put_with_tags<V>(
        &self,
        tags: &TagSet,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<(), DomainError>
    where
        V: Serialize + Sync,
    {
        ensure_ttl(ttl)?;

        let data = serde_json::to_string(value)
            .map_err(|e| DomainError::cache(format!("Failed to serialize cache value: {}", e)))?;

        self.tags.register(tags, key, ttl).await?;
        self.store.set_raw(key, &data, ttl).await
    }

    /// Reads a value; a miss is `Ok(None)`
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned + Send,
    {
        self.store.get(key).await
    }

    /// Removes a key; removing an absent key succeeds
    pub async fn forget(&self, key: &str) -> Result<bool, DomainError> {
        self.store.delete(key).await
    }

    /// Removes every entry registered under any of `tags`
    #[instrument(skip_all, fields(tags = %tags))]
    pub async fn forget_by_tags(&self, tags: &TagSet) -> Result<usize, DomainError> {
        if tags.is_empty() {
            return Ok(0);
        }

        let removed = self.tags.invalidate(tags).await?;
        debug!(removed, strategy = %self.tags.strategy(), "Invalidated cache tags");

        Ok(removed)
    }

    /// Removes every key matching a glob pattern
    ///
    /// Best effort: on a store that cannot enumerate keys nothing is removed
    /// and `Ok(None)` is returned instead of an error.
    pub async fn forget_by_pattern(&self, pattern: &str) -> Result<Option<usize>, DomainError> {
        if !self.store.supports_pattern_scan() {
            warn!(
                pattern,
                driver = self.store.driver(),
                "Cache store cannot enumerate keys, pattern removal skipped"
            );
            return Ok(None);
        }

        let removed = self.store.delete_pattern(pattern).await?;
        debug!(pattern, removed, "Removed cache keys by pattern");

        Ok(Some(removed))
    }

    /// Empties the whole cache namespace and the tag index
    pub async fn flush(&self) -> Result<(), DomainError> {
        self.store.clear().await?;
        self.tags.reset().await?;
        info!(driver = self.store.driver(), "Cache flushed");

        Ok(())
    }

    /// Driver diagnostics, with unknown fields left empty
    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        let mut stats = self.store.stats().await?;
        stats.tag_strategy = Some(self.tags.strategy().to_string());

        Ok(stats)
    }

    async fn cached<V>(&self, key: &str) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned,
    {
        let Some(raw) = self.store.get_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }
}

fn ensure_ttl(ttl: Duration) -> Result<(), DomainError> {
    if ttl.is_zero() {
        return Err(DomainError::validation("ttl", "Cache TTL must be greater than zero"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::cache::{MockCache, TagStrategy};
    use crate::infrastructure::cache::{FlatStore, InMemoryCache, TaggingStore};

    const TTL: Duration = Duration::from_secs(60);

    fn in_memory_service() -> CacheService {
        let store: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let tags = Arc::new(FlatStore::new(store.clone()));
        CacheService::new(store, tags, KeyBuilder::new("test"))
    }

    fn mock_service(mock: MockCache) -> CacheService {
        let store: Arc<dyn CacheStore> = Arc::new(mock);
        let tags: Arc<dyn TagIndex> = if store.supports_tagging() {
            Arc::new(TaggingStore::new(store.clone()).unwrap())
        } else {
            Arc::new(FlatStore::new(store.clone()))
        };
        CacheService::new(store, tags, KeyBuilder::new("test"))
    }

    fn tags(names: &[&str]) -> TagSet {
        names.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = in_memory_service();

        cache.put("k", &vec![1, 2, 3], TTL).await.unwrap();

        let value: Option<Vec<i32>> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_put_forget_get() {
        let cache = in_memory_service();

        cache.put("k", &"v", TTL).await.unwrap();
        assert!(cache.forget("k").await.unwrap());

        let value: Option<String> = cache.get("k").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_forget_absent_key_succeeds() {
        let cache = in_memory_service();
        assert!(!cache.forget("never-set").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let cache = in_memory_service();
        let value: Option<String> = cache.get("missing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_remember_runs_producer_once_then_hits() {
        let cache = in_memory_service();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value: String = cache
                .remember("k", TTL, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "computed");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remember_producer_error_stores_nothing() {
        let cache = in_memory_service();

        let result: Result<String, _> = cache
            .remember("k", TTL, || async { Err(DomainError::internal("db down")) })
            .await;
        assert!(result.is_err());

        let value: Option<String> = cache.get("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_remember_is_not_single_flight() {
        let cache = mock_service(MockCache::new());
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let producer = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(7u32)
        };

        let (a, b) = tokio::join!(
            cache.remember("k", TTL, producer),
            cache.remember("k", TTL, producer)
        );

        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remember_recomputes_undecodable_entry() {
        let cache = mock_service(MockCache::new().with_entry("k", &"not a number"));

        let value: u32 = cache.remember("k", TTL, || async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);

        let stored: Option<u32> = cache.get("k").await.unwrap();
        assert_eq!(stored, Some(5));
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let cache = in_memory_service();

        let result = cache.put("k", &1, Duration::ZERO).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_put_with_huge_ttl_is_stored_and_tagged() {
        let cache = in_memory_service();

        cache
            .put_with_tags(&tags(&["t"]), "k", &1, Duration::MAX)
            .await
            .unwrap();

        let value: Option<i32> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(1));
        assert_eq!(cache.forget_by_tags(&tags(&["t"])).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forget_by_tags_can_be_retried_after_store_failure() {
        let cache = mock_service(MockCache::new().with_failing_delete(2));

        for key in ["a", "b", "c"] {
            cache.put_with_tags(&tags(&["t"]), key, &key, TTL).await.unwrap();
        }

        assert!(cache.forget_by_tags(&tags(&["t"])).await.is_err());
        assert_eq!(cache.forget_by_tags(&tags(&["t"])).await.unwrap(), 2);

        for key in ["a", "b", "c"] {
            let value: Option<String> = cache.get(key).await.unwrap();
            assert!(value.is_none());
        }
    }

    #[tokio::test]
    async fn test_remember_with_tags_then_forget_by_tags() {
        for mock in [MockCache::new(), MockCache::new().with_tagging()] {
            let cache = mock_service(mock);

            let _: String = cache
                .remember_with_tags(&tags(&["t"]), "k", TTL, || async { Ok("v".to_string()) })
                .await
                .unwrap();
            cache.put("other", &"keep", TTL).await.unwrap();

            let removed = cache.forget_by_tags(&tags(&["t"])).await.unwrap();
            assert_eq!(removed, 1);

            let value: Option<String> = cache.get("k").await.unwrap();
            assert!(value.is_none());
            let other: Option<String> = cache.get("other").await.unwrap();
            assert_eq!(other, Some("keep".to_string()));
        }
    }

    #[tokio::test]
    async fn test_forget_by_tags_without_members_succeeds() {
        let cache = in_memory_service();

        assert_eq!(cache.forget_by_tags(&tags(&["empty"])).await.unwrap(), 0);
        assert_eq!(cache.forget_by_tags(&TagSet::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_forget_by_pattern() {
        let cache = in_memory_service();

        cache.put("test:task_1", &1, TTL).await.unwrap();
        cache.put("test:task_2", &2, TTL).await.unwrap();
        cache.put("test:user_1_comments", &3, TTL).await.unwrap();

        let removed = cache.forget_by_pattern("test:task_*").await.unwrap();
        assert_eq!(removed, Some(2));

        let left: Option<i32> = cache.get("test:user_1_comments").await.unwrap();
        assert_eq!(left, Some(3));
    }

    #[tokio::test]
    async fn test_forget_by_pattern_without_enumeration_is_skipped() {
        let cache = mock_service(MockCache::new());
        cache.put("test:task_1", &1, TTL).await.unwrap();

        let result = cache.forget_by_pattern("test:*").await.unwrap();
        assert_eq!(result, None);

        let still_there: Option<i32> = cache.get("test:task_1").await.unwrap();
        assert_eq!(still_there, Some(1));
    }

    #[tokio::test]
    async fn test_flush_clears_entries_and_tags() {
        let cache = in_memory_service();

        cache.put_with_tags(&tags(&["t"]), "a", &1, TTL).await.unwrap();
        cache.put("b", &2, TTL).await.unwrap();

        cache.flush().await.unwrap();

        let a: Option<i32> = cache.get("a").await.unwrap();
        let b: Option<i32> = cache.get("b").await.unwrap();
        assert!(a.is_none() && b.is_none());
        assert_eq!(cache.forget_by_tags(&tags(&["t"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let cache = mock_service(MockCache::new().with_error("connection refused"));

        let result: Result<u32, _> = cache.remember("k", TTL, || async { Ok(1) }).await;
        assert!(result.unwrap_err().is_store_unavailable());

        let result: Result<Option<u32>, _> = cache.get("k").await;
        assert!(result.unwrap_err().is_store_unavailable());
    }

    #[tokio::test]
    async fn test_stats_reports_strategy() {
        let cache = in_memory_service();
        let stats = cache.stats().await.unwrap();

        assert_eq!(stats.driver, "in_memory");
        assert_eq!(
            stats.tag_strategy,
            Some(TagStrategy::LocalTracking.to_string())
        );
    }

    #[test]
    fn test_generate_key() {
        let cache = in_memory_service();

        assert_eq!(cache.generate_key("task_1"), "test:task_1");
        let key = cache.generate_key_with(&CacheKeyParams::new("list").with_component("a", "1"));
        assert!(key.starts_with("test:list:"));
    }
}
