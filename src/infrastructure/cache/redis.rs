//! Redis cache store

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, InfoDict, RedisError};

use crate::domain::cache::{CacheStats, CacheStore};
use crate::domain::DomainError;

const DRIVER: &str = "redis";

/// Adds `ARGV[1]` to every tag in `KEYS`, scored by its expiry time
///
/// Members already past their deadline are dropped, and each tag set's own
/// TTL is only ever extended, so it outlives its longest-lived member.
const TAG_KEY_SCRIPT: &str = r"
local member = ARGV[1]
local ttl = tonumber(ARGV[2])
local now = tonumber(redis.call('TIME')[1])
local deadline = now + ttl

for _, tag in ipairs(KEYS) do
    redis.call('ZREMRANGEBYSCORE', tag, '-inf', now)

    local current = redis.call('ZSCORE', tag, member)
    if not current or tonumber(current) < deadline then
        redis.call('ZADD', tag, deadline, member)
    end

    if redis.call('TTL', tag) < ttl then
        redis.call('EXPIRE', tag, ttl)
    end
end

return 'OK'
";

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Namespace that scopes flush, key counting and tag sets
    pub namespace: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
    /// Per-command response timeout
    pub response_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            namespace: None,
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

/// Redis cache store
///
/// Tags are native: each tag is a Redis sorted set at `{namespace}:tag:{tag}`
/// whose members are keys scored by their expiry time. Expired members are
/// trimmed on every write to the tag, and the set itself expires with its
/// longest-lived member. Pattern deletion uses `SCAN`, never `KEYS`.
/// Connection and response timeouts are enforced by the connection manager;
/// failures to reach the server surface as `StoreUnavailable`.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Connects to Redis
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::configuration(format!("Invalid Redis URL '{}': {}", config.url, e))
        })?;

        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout)
            .set_response_timeout(config.response_timeout);

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new_with_config(client, manager_config),
        )
        .await
        .map_err(|_| DomainError::store_unavailable(DRIVER, "Timed out connecting to Redis"))?
        .map_err(|e| {
            DomainError::store_unavailable(DRIVER, format!("Failed to connect to Redis: {}", e))
        })?;

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisCacheConfig::new(url)).await
    }

    fn tag_key(&self, tag: &str) -> String {
        match &self.config.namespace {
            Some(namespace) => format!("{}:tag:{}", namespace, tag),
            None => format!("tag:{}", tag),
        }
    }

    fn namespace_pattern(&self) -> Option<String> {
        self.config
            .namespace
            .as_ref()
            .map(|namespace| format!("{}:*", namespace))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error(format!("scan '{}'", pattern), e))?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

/// Connection-level failures become `StoreUnavailable`, the rest are cache errors
fn map_redis_error(operation: impl fmt::Display, error: RedisError) -> DomainError {
    if error.is_io_error()
        || error.is_timeout()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
    {
        DomainError::store_unavailable(DRIVER, format!("Failed to {}: {}", operation, error))
    } else {
        DomainError::cache(format!("Redis failed to {}: {}", operation, error))
    }
}

/// Parses the `keys=` field of an INFO keyspace line such as `keys=3,expires=1,avg_ttl=0`
fn parse_keyspace_keys(line: &str) -> Option<u64> {
    line.split(',')
        .find_map(|part| part.strip_prefix("keys="))
        .and_then(|count| count.parse().ok())
}

#[async_trait]
impl CacheStore for RedisCache {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    fn supports_tagging(&self) -> bool {
        true
    }

    fn supports_pattern_scan(&self) -> bool {
        true
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| map_redis_error(format!("get key '{}'", key), e))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| map_redis_error(format!("set key '{}'", key), e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| map_redis_error(format!("delete key '{}'", key), e))?;

        Ok(deleted > 0)
    }

    async fn tag_keys(&self, tags: &[String], key: &str, ttl: Duration) -> Result<(), DomainError> {
        if tags.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let script = redis::Script::new(TAG_KEY_SCRIPT);
        let mut invocation = script.prepare_invoke();

        for tag in tags {
            invocation.key(self.tag_key(tag));
        }

        invocation
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .invoke_async::<()>(&mut conn)
            .await
            .map_err(|e| map_redis_error(format!("tag key '{}'", key), e))
    }

    async fn delete_by_tags(&self, tags: &[String]) -> Result<usize, DomainError> {
        if tags.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let tag_keys: Vec<String> = tags.iter().map(|tag| self.tag_key(tag)).collect();

        let mut read = redis::pipe();
        for tag_key in &tag_keys {
            read.zrange(tag_key, 0, -1);
        }

        let members: HashSet<String> = read
            .query_async::<Vec<Vec<String>>>(&mut conn)
            .await
            .map_err(|e| map_redis_error("read tag members", e))?
            .into_iter()
            .flatten()
            .collect();

        // Keys tagged between the read and this point lose their linkage but stay cached
        let mut pipe = redis::pipe();
        pipe.atomic();

        if !members.is_empty() {
            let keys: Vec<&String> = members.iter().collect();
            pipe.del(keys);
        }
        pipe.del(&tag_keys);

        let results: Vec<i64> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("delete tagged keys", e))?;

        if members.is_empty() {
            return Ok(0);
        }

        Ok(results.first().copied().unwrap_or(0).max(0) as usize)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.scan(pattern).await?;
        let mut total_deleted = 0usize;
        let mut conn = self.connection.clone();

        for chunk in keys.chunks(100) {
            let deleted: i64 = conn
                .del(chunk.to_vec())
                .await
                .map_err(|e| map_redis_error("delete scanned keys", e))?;
            total_deleted += deleted.max(0) as usize;
        }

        Ok(total_deleted)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        // With a namespace only our keys (and tag sets) go; otherwise the whole database
        match self.namespace_pattern() {
            Some(pattern) => {
                self.delete_pattern(&pattern).await?;
            }
            None => {
                let mut conn = self.connection.clone();
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("flush database", e))?;
            }
        }

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, DomainError> {
        let mut conn = self.connection.clone();

        let info: InfoDict = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("read server info", e))?;

        let total_keys = match self.namespace_pattern() {
            Some(pattern) => Some(self.scan(&pattern).await?.len() as u64),
            None => info
                .get::<String>("db0")
                .as_deref()
                .and_then(parse_keyspace_keys),
        };

        Ok(CacheStats {
            memory_usage: info.get("used_memory_human"),
            total_keys,
            hits: info.get("keyspace_hits"),
            misses: info.get("keyspace_misses"),
            ..CacheStats::new(DRIVER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheStoreExt;

    // These tests require a running Redis instance:
    // cargo test -- --ignored

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::new("redis://127.0.0.1:6379").with_namespace("taskboard_test")
    }

    #[test]
    fn test_parse_keyspace_keys() {
        assert_eq!(parse_keyspace_keys("keys=12,expires=3,avg_ttl=0"), Some(12));
        assert_eq!(parse_keyspace_keys("expires=3"), None);
    }

    #[test]
    fn test_config_builder() {
        let config = RedisCacheConfig::new("redis://localhost")
            .with_namespace("app")
            .with_response_timeout(Duration::from_millis(500));

        assert_eq!(config.namespace, Some("app".to_string()));
        assert_eq!(config.response_timeout, Duration::from_millis(500));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let result = RedisCache::with_url("not a url").await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_get_delete() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        cache
            .set("taskboard_test:key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("taskboard_test:key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        assert!(cache.delete("taskboard_test:key1").await.unwrap());
        assert!(!cache.delete("taskboard_test:key1").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_delete_by_tags() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let ttl = Duration::from_secs(60);

        cache.set("taskboard_test:a", &1, ttl).await.unwrap();
        cache.set("taskboard_test:b", &2, ttl).await.unwrap();
        cache
            .tag_keys(&["t1".to_string()], "taskboard_test:a", ttl)
            .await
            .unwrap();

        let removed = cache.delete_by_tags(&["t1".to_string()]).await.unwrap();
        assert_eq!(removed, 1);

        let a: Option<i32> = cache.get("taskboard_test:a").await.unwrap();
        let b: Option<i32> = cache.get("taskboard_test:b").await.unwrap();
        assert_eq!(a, None);
        assert_eq!(b, Some(2));

        cache.clear().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_tag_sets_expire_and_drop_stale_members() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let tag_key = cache.tag_key("ttl_tag");
        let mut conn = cache.connection.clone();

        cache
            .tag_keys(&["ttl_tag".to_string()], "taskboard_test:short", Duration::from_secs(1))
            .await
            .unwrap();
        cache
            .tag_keys(&["ttl_tag".to_string()], "taskboard_test:long", Duration::from_secs(120))
            .await
            .unwrap();

        let ttl: i64 = conn.ttl(&tag_key).await.unwrap();
        assert!(ttl > 60 && ttl <= 120);

        // A shorter member never shortens the set's lifetime
        cache
            .tag_keys(&["ttl_tag".to_string()], "taskboard_test:brief", Duration::from_secs(1))
            .await
            .unwrap();
        let ttl: i64 = conn.ttl(&tag_key).await.unwrap();
        assert!(ttl > 60);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        cache
            .tag_keys(&["ttl_tag".to_string()], "taskboard_test:fresh", Duration::from_secs(60))
            .await
            .unwrap();

        let members: Vec<String> = conn.zrange(&tag_key, 0, -1).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains(&"taskboard_test:long".to_string()));
        assert!(members.contains(&"taskboard_test:fresh".to_string()));

        cache.clear().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_stats() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let stats = cache.stats().await.unwrap();

        assert_eq!(stats.driver, "redis");
        assert!(stats.memory_usage.is_some());
    }
}
