//! Task and comment cache conventions: keys, tags, TTLs and invalidation fan-out

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::domain::cache::{CacheKeyParams, TagSet};
use crate::domain::task::{TaskId, TaskStatus};
use crate::domain::user::UserId;
use crate::domain::DomainError;

use super::cache_service::CacheService;

/// Lifetime of cached tasks and task lists
pub const TASK_TTL: Duration = Duration::from_secs(30 * 60);

/// Lifetime of cached comment lists
pub const COMMENT_TTL: Duration = Duration::from_secs(15 * 60);

pub const TASKS_TAG: &str = "tasks";
pub const TASK_LIST_TAG: &str = "task_list";
pub const COMMENTS_TAG: &str = "comments";
pub const DASHBOARD_TAG: &str = "dashboard";

pub fn task_tag(id: TaskId) -> String {
    format!("task_{}", id)
}

pub fn task_comments_tag(id: TaskId) -> String {
    format!("task_{}_comments", id)
}

pub fn user_tag(id: UserId) -> String {
    format!("user_{}", id)
}

pub fn status_tag(status: TaskStatus) -> String {
    format!("status_{}", status.as_str())
}

/// Filters applied to a cached task list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskListFilter {
    pub user_id: Option<UserId>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

impl TaskListFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    fn key_params(&self, list_name: &str) -> CacheKeyParams {
        let mut params = CacheKeyParams::new(list_name);

        if let Some(user_id) = self.user_id {
            params = params.with_component("user_id", user_id.to_string());
        }
        if let Some(status) = self.status {
            params = params.with_component("status", status.as_str());
        }
        if let Some(search) = &self.search {
            params = params.with_component("search", search.clone());
        }

        params
    }

    fn tags(&self) -> TagSet {
        let mut tags = TagSet::new().with(TASKS_TAG).with(TASK_LIST_TAG);

        if let Some(user_id) = self.user_id {
            tags.insert(user_tag(user_id));
        }
        if let Some(status) = self.status {
            tags.insert(status_tag(status));
        }

        tags
    }
}

/// Everything one task mutation invalidates
///
/// Always covers the task itself, every task list and the dashboard;
/// users and statuses accumulate as the mutation touches them.
#[derive(Debug, Clone)]
pub struct TaskCacheInvalidation {
    task_id: TaskId,
    tags: TagSet,
}

impl TaskCacheInvalidation {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            tags: TagSet::new()
                .with(task_tag(task_id))
                .with(TASK_LIST_TAG)
                .with(DASHBOARD_TAG),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn with_user(mut self, user: impl Into<Option<UserId>>) -> Self {
        if let Some(user) = user.into() {
            self.tags.insert(user_tag(user));
        }
        self
    }

    pub fn with_status(mut self, status: impl Into<Option<TaskStatus>>) -> Self {
        if let Some(status) = status.into() {
            self.tags.insert(status_tag(status));
        }
        self
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }
}

/// Caching rules for tasks and comments on top of [`CacheService`]
#[derive(Debug, Clone)]
pub struct TaskCachePolicy {
    cache: Arc<CacheService>,
}

impl TaskCachePolicy {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn task_key(&self, task_id: TaskId) -> String {
        self.cache.generate_key(&task_tag(task_id))
    }

    pub fn task_list_key(&self, list_name: &str, filter: &TaskListFilter) -> String {
        self.cache.generate_key_with(&filter.key_params(list_name))
    }

    pub fn task_comments_key(&self, task_id: TaskId) -> String {
        self.cache.generate_key(&task_comments_tag(task_id))
    }

    pub fn user_comments_key(&self, user_id: UserId) -> String {
        self.cache.generate_key(&format!("user_{}_comments", user_id))
    }

    /// Single task, tagged `{tasks, task_{id}}`
    pub async fn cache_task<V, F, Fut>(&self, task_id: TaskId, producer: F) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        let tags = TagSet::new().with(TASKS_TAG).with(task_tag(task_id));

        self.cache
            .remember_with_tags(&tags, &self.task_key(task_id), TASK_TTL, producer)
            .await
    }

    /// Filtered task list, tagged by list, user and status
    pub async fn cache_task_list<V, F, Fut>(
        &self,
        list_name: &str,
        filter: &TaskListFilter,
        producer: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        let key = self.task_list_key(list_name, filter);

        self.cache
            .remember_with_tags(&filter.tags(), &key, TASK_TTL, producer)
            .await
    }

    /// Comments of one task, tagged `{comments, task_{id}_comments, task_{id}}`
    pub async fn cache_task_comments<V, F, Fut>(
        &self,
        task_id: TaskId,
        producer: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        let tags = TagSet::new()
            .with(COMMENTS_TAG)
            .with(task_comments_tag(task_id))
            .with(task_tag(task_id));

        self.cache
            .remember_with_tags(&tags, &self.task_comments_key(task_id), COMMENT_TTL, producer)
            .await
    }

    /// Comments written by one user, tagged `{comments, user_{id}}`
    pub async fn cache_user_comments<V, F, Fut>(
        &self,
        user_id: UserId,
        producer: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send,
    {
        let tags = TagSet::new().with(COMMENTS_TAG).with(user_tag(user_id));

        self.cache
            .remember_with_tags(&tags, &self.user_comments_key(user_id), COMMENT_TTL, producer)
            .await
    }

    /// Drops everything a change to `task_id` may have made stale
    pub async fn invalidate_task_caches(
        &self,
        task_id: TaskId,
        user_id: Option<UserId>,
        status: Option<TaskStatus>,
    ) -> Result<usize, DomainError> {
        let invalidation = TaskCacheInvalidation::new(task_id)
            .with_user(user_id)
            .with_status(status);

        self.invalidate(&invalidation).await
    }

    /// Applies an accumulated invalidation in a single tag flush
    pub async fn invalidate(&self, invalidation: &TaskCacheInvalidation) -> Result<usize, DomainError> {
        let removed = self.cache.forget_by_tags(invalidation.tags()).await?;
        debug!(task_id = %invalidation.task_id(), removed, "Task caches invalidated");

        Ok(removed)
    }

    /// Drops a task's comment list and the author's cached comments
    pub async fn invalidate_comment_caches(
        &self,
        task_id: TaskId,
        user_id: UserId,
    ) -> Result<usize, DomainError> {
        let tags = TagSet::new()
            .with(task_comments_tag(task_id))
            .with(user_tag(user_id))
            .with(DASHBOARD_TAG);

        let removed = self.cache.forget_by_tags(&tags).await?;
        debug!(task_id = %task_id, user_id = %user_id, removed, "Comment caches invalidated");

        Ok(removed)
    }
}
