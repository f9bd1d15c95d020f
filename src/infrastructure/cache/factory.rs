//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::cache::{CacheStore, KeyBuilder, TagIndex, DEFAULT_KEY_PREFIX};
use crate::domain::DomainError;
use crate::infrastructure::services::CacheService;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};
use super::tag_index::{FlatStore, TaggingStore};

/// Supported cache drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheType {
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis cache
    Redis,
}

impl CacheType {
    /// Whether every process using this driver sees the same entries
    pub fn is_shared(&self) -> bool {
        matches!(self, CacheType::Redis)
    }
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" | "array" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache driver: {}. Valid drivers: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Driver to create
    pub driver: CacheType,
    /// Key namespace, also scopes Redis flushes and tag sets
    pub prefix: String,
    /// Redis URL (required for the Redis driver)
    pub redis_url: Option<String>,
    /// Upper bound on entry lifetime (in-memory only)
    pub max_ttl: Duration,
    /// Maximum number of entries (in-memory only)
    pub max_capacity: u64,
    pub connection_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheType::InMemory,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            redis_url: None,
            max_ttl: Duration::from_secs(7200),
            max_capacity: 10_000,
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            driver: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_timeouts(mut self, connection: Duration, response: Duration) -> Self {
        self.connection_timeout = connection;
        self.response_timeout = response;
        self
    }
}

/// Builds a store, picks its tag strategy and wraps both in a [`CacheService`]
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the cache facade described by `config`
    pub async fn create(&self, config: &CacheConfig) -> Result<CacheService, DomainError> {
        if config.prefix.trim().is_empty() {
            return Err(DomainError::configuration("Cache prefix must not be empty"));
        }

        let store = self.create_store(config).await?;
        let cache = Self::assemble(store, KeyBuilder::new(config.prefix.clone()))?;

        info!(
            driver = %config.driver,
            prefix = %config.prefix,
            strategy = %cache.tag_index().strategy(),
            "Cache initialized"
        );

        Ok(cache)
    }

    /// Creates only the backing store
    pub async fn create_store(
        &self,
        config: &CacheConfig,
    ) -> Result<Arc<dyn CacheStore>, DomainError> {
        match config.driver {
            CacheType::InMemory => {
                let in_memory_config = InMemoryCacheConfig::default()
                    .with_max_capacity(config.max_capacity)
                    .with_max_ttl(config.max_ttl);

                Ok(Arc::new(InMemoryCache::with_config(in_memory_config)))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis cache driver")
                })?;

                let redis_config = RedisCacheConfig::new(url)
                    .with_namespace(config.prefix.clone())
                    .with_connection_timeout(config.connection_timeout)
                    .with_response_timeout(config.response_timeout);

                Ok(Arc::new(RedisCache::new(redis_config).await?))
            }
        }
    }

    /// Wraps a store in the facade, resolving the tag strategy once
    pub fn assemble(
        store: Arc<dyn CacheStore>,
        keys: KeyBuilder,
    ) -> Result<CacheService, DomainError> {
        let tags: Arc<dyn TagIndex> = if store.supports_tagging() {
            Arc::new(TaggingStore::new(store.clone())?)
        } else {
            Arc::new(FlatStore::new(store.clone()))
        };

        Ok(CacheService::new(store, tags, keys))
    }

    /// In-memory facade with default settings
    pub fn create_in_memory(&self, prefix: impl Into<String>) -> CacheService {
        let store: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let tags = Arc::new(FlatStore::new(store.clone()));

        CacheService::new(store, tags, KeyBuilder::new(prefix))
    }
}
