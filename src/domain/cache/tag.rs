//! Cache tags and the tag index abstraction

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

/// An ordered, de-duplicated set of cache tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.0.insert(tag.into());
        self
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    pub fn extend(&mut self, other: TagSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.iter().collect();
        write!(f, "{}", tags.join(", "))
    }
}

/// How tag membership is maintained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStrategy {
    /// Membership kept by the store itself
    Native,
    /// Membership tracked in-process for stores without tag support
    LocalTracking,
}

impl fmt::Display for TagStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagStrategy::Native => write!(f, "native"),
            TagStrategy::LocalTracking => write!(f, "local_tracking"),
        }
    }
}

/// Associates cache keys with tags and invalidates them in bulk
#[async_trait]
pub trait TagIndex: Send + Sync + fmt::Debug {
    fn strategy(&self) -> TagStrategy;

    /// Registers `key` under every tag; must run before the entry is stored
    async fn register(&self, tags: &TagSet, key: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Removes every entry registered under any of the tags and clears them
    async fn invalidate(&self, tags: &TagSet) -> Result<usize, DomainError>;

    /// Drops all membership; called when the whole cache is flushed
    async fn reset(&self) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_set_dedups_and_sorts() {
        let tags: TagSet = ["tasks", "task_1", "tasks"].into_iter().collect();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.to_vec(), vec!["task_1".to_string(), "tasks".to_string()]);
        assert_eq!(tags.to_string(), "task_1, tasks");
    }

    #[test]
    fn test_tag_set_extend() {
        let mut tags = TagSet::new().with("a");
        tags.extend(TagSet::new().with("b").with("a"));

        assert!(tags.contains("a"));
        assert!(tags.contains("b"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(TagStrategy::Native.to_string(), "native");
        assert_eq!(TagStrategy::LocalTracking.to_string(), "local_tracking");
    }
}
