//! Cache domain - store abstraction, key building and tagging

mod key;
mod store;
mod tag;

pub use key::{CacheKeyParams, KeyBuilder, DEFAULT_KEY_PREFIX};
pub use store::{glob_to_regex, CacheStats, CacheStore, CacheStoreExt};
pub use tag::{TagIndex, TagSet, TagStrategy};

#[cfg(test)]
pub use store::mock::MockCache;
