//! Tag index strategies
//!
//! [`TaggingStore`] hands tag bookkeeping to a store with native support
//! (Redis sets). [`FlatStore`] keeps tag membership in-process for stores
//! without it, so tag invalidation stays scoped instead of degrading to a
//! no-op or a full flush. The strategy is chosen once, when the cache is built.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::cache::{CacheStore, TagIndex, TagSet, TagStrategy};
use crate::domain::DomainError;

/// Tag index backed by the store's own tag support
#[derive(Debug)]
pub struct TaggingStore {
    store: Arc<dyn CacheStore>,
}

impl TaggingStore {
    /// Fails when the store cannot group keys by tag
    pub fn new(store: Arc<dyn CacheStore>) -> Result<Self, DomainError> {
        if !store.supports_tagging() {
            return Err(DomainError::unsupported(store.driver(), "native tagging"));
        }

        Ok(Self { store })
    }
}

#[async_trait]
impl TagIndex for TaggingStore {
    fn strategy(&self) -> TagStrategy {
        TagStrategy::Native
    }

    async fn register(&self, tags: &TagSet, key: &str, ttl: Duration) -> Result<(), DomainError> {
        if tags.is_empty() {
            return Ok(());
        }

        self.store.tag_keys(&tags.to_vec(), key, ttl).await
    }

    async fn invalidate(&self, tags: &TagSet) -> Result<usize, DomainError> {
        if tags.is_empty() {
            return Ok(0);
        }

        self.store.delete_by_tags(&tags.to_vec()).await
    }

    async fn reset(&self) -> Result<(), DomainError> {
        // Tag sets live in the store's namespace and go away with its flush
        Ok(())
    }
}

/// Deadline used when a TTL would overflow the clock
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// How often a registration sweeps expired members out of every tag
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type Members = HashMap<String, HashMap<String, Instant>>;

#[derive(Debug)]
struct Index {
    tags: Members,
    next_sweep: Instant,
}

/// Tag index that tracks `tag -> {key: deadline}` in-process
///
/// Expired members are dropped from the written tag on every registration,
/// and from the whole index at most once per sweep interval, so tags that
/// are never written again do not outlive their entries for long. A member
/// is only unlinked after its delete succeeded, so a failed invalidation can
/// be retried. Membership is exact for process-local stores; it cannot see
/// keys tagged by other processes.
#[derive(Debug)]
pub struct FlatStore {
    store: Arc<dyn CacheStore>,
    index: RwLock<Index>,
    sweep_interval: Duration,
}

impl FlatStore {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_sweep_interval(store, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(store: Arc<dyn CacheStore>, sweep_interval: Duration) -> Self {
        Self {
            store,
            index: RwLock::new(Index {
                tags: HashMap::new(),
                next_sweep: deadline_after(Instant::now(), sweep_interval),
            }),
            sweep_interval,
        }
    }

    /// Live keys currently registered under a tag
    pub fn members_of(&self, tag: &str) -> Result<HashSet<String>, DomainError> {
        let index = self.read()?;
        let now = Instant::now();

        Ok(index
            .tags
            .get(tag)
            .map(|keys| {
                keys.iter()
                    .filter(|(_, deadline)| **deadline > now)
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Number of tags with at least one registered key
    pub fn tag_count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.tags.len())
    }

    /// Drops expired members and empty tags from the whole index
    ///
    /// Returns the number of members dropped.
    pub fn prune_expired(&self) -> Result<usize, DomainError> {
        let mut index = self.write()?;
        let now = Instant::now();

        index.next_sweep = deadline_after(now, self.sweep_interval);
        Ok(sweep(&mut index.tags, now))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Index>, DomainError> {
        self.index
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Index>, DomainError> {
        self.index
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    /// Removes deleted keys from the tags they were read under
    ///
    /// A member whose deadline moved past the one read was re-registered
    /// meanwhile and stays linked.
    fn unlink(&self, deleted: Vec<(String, Vec<(String, Instant)>)>) -> Result<(), DomainError> {
        if deleted.is_empty() {
            return Ok(());
        }

        let mut index = self.write()?;

        for (key, links) in deleted {
            for (tag, seen) in links {
                let Some(keys) = index.tags.get_mut(&tag) else {
                    continue;
                };

                if keys.get(&key).is_some_and(|deadline| *deadline <= seen) {
                    keys.remove(&key);
                }
                if keys.is_empty() {
                    index.tags.remove(&tag);
                }
            }
        }

        Ok(())
    }
}

fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn sweep(tags: &mut Members, now: Instant) -> usize {
    let mut dropped = 0;

    tags.retain(|_, keys| {
        let before = keys.len();
        keys.retain(|_, deadline| *deadline > now);
        dropped += before - keys.len();
        !keys.is_empty()
    });

    dropped
}

#[async_trait]
impl TagIndex for FlatStore {
    fn strategy(&self) -> TagStrategy {
        TagStrategy::LocalTracking
    }

    async fn register(&self, tags: &TagSet, key: &str, ttl: Duration) -> Result<(), DomainError> {
        if tags.is_empty() {
            return Ok(());
        }

        let now = Instant::now();
        let deadline = deadline_after(now, ttl);

        let mut index = self.write()?;

        if now >= index.next_sweep {
            let dropped = sweep(&mut index.tags, now);
            index.next_sweep = deadline_after(now, self.sweep_interval);
            debug!(dropped, remaining_tags = index.tags.len(), "Swept expired tag members");
        }

        for tag in tags.iter() {
            let keys = index.tags.entry(tag.to_string()).or_default();
            keys.retain(|_, expires| *expires > now);

            let entry = keys.entry(key.to_string()).or_insert(deadline);
            if *entry < deadline {
                *entry = deadline;
            }
        }

        Ok(())
    }

    async fn invalidate(&self, tags: &TagSet) -> Result<usize, DomainError> {
        if tags.is_empty() {
            return Ok(0);
        }

        // Snapshot the members; the lock must not be held across awaits
        let candidates: HashMap<String, Vec<(String, Instant)>> = {
            let index = self.read()?;
            let mut candidates: HashMap<String, Vec<(String, Instant)>> = HashMap::new();

            for tag in tags.iter() {
                if let Some(keys) = index.tags.get(tag) {
                    for (key, deadline) in keys {
                        candidates
                            .entry(key.clone())
                            .or_default()
                            .push((tag.to_string(), *deadline));
                    }
                }
            }

            candidates
        };

        let total = candidates.len();
        let mut removed = 0;
        let mut deleted = Vec::with_capacity(total);
        let mut failure = None;

        for (key, links) in candidates {
            match self.store.delete(&key).await {
                Ok(existed) => {
                    if existed {
                        removed += 1;
                    }
                    deleted.push((key, links));
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let unlinked = deleted.len();
        self.unlink(deleted)?;

        if let Some(e) = failure {
            warn!(
                tags = %tags,
                unlinked,
                pending = total - unlinked,
                error = %e,
                "Tag invalidation interrupted; remaining members stay linked"
            );
            return Err(e);
        }

        debug!(tags = %tags, candidates = total, removed, "Invalidated tracked tag members");

        Ok(removed)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        self.write()?.tags.clear();

        Ok(())
    }
}
