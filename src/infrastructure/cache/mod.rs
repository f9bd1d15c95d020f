//! Cache infrastructure - store implementations and tag strategies

mod factory;
mod in_memory;
mod redis;
mod tag_index;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
pub use tag_index::{FlatStore, TaggingStore};
