//! Cache warmer - precomputes task, task list and comment entries

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::comment::{Comment, CommentRepository};
use crate::domain::task::{Task, TaskRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;

use super::cache_policy::{TaskCachePolicy, TaskListFilter};
use super::task_service::USER_TASKS_ALL;

/// Number of entries written by a warm-up run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub tasks: usize,
    pub task_lists: usize,
    pub task_comments: usize,
}

impl WarmReport {
    pub fn total(&self) -> usize {
        self.tasks + self.task_lists + self.task_comments
    }
}

/// Fills the cache from the repositories
#[derive(Debug, Clone)]
pub struct CacheWarmer {
    tasks: Arc<dyn TaskRepository>,
    comments: Arc<dyn CommentRepository>,
    cache: TaskCachePolicy,
}

impl CacheWarmer {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        comments: Arc<dyn CommentRepository>,
        cache: TaskCachePolicy,
    ) -> Self {
        Self {
            tasks,
            comments,
            cache,
        }
    }

    /// Caches every task, each participant's task list and every task's comments
    pub async fn warm(&self) -> Result<WarmReport, DomainError> {
        let tasks = self.tasks.list().await?;
        let mut report = WarmReport::default();

        for task in &tasks {
            let snapshot = Some(task.clone());
            let _: Option<Task> = self
                .cache
                .cache_task(task.id(), || async move { Ok(snapshot) })
                .await?;
            report.tasks += 1;
        }

        let users: BTreeSet<UserId> = tasks
            .iter()
            .flat_map(|t| std::iter::once(t.created_by()).chain(t.assigned_to()))
            .collect();

        for user in users {
            let _: Vec<Task> = self
                .cache
                .cache_task_list(USER_TASKS_ALL, &TaskListFilter::for_user(user), || {
                    self.tasks.list_for_user(user)
                })
                .await?;
            report.task_lists += 1;
        }

        for task in &tasks {
            let task_id = task.id();
            let comments: Vec<Comment> = self
                .cache
                .cache_task_comments(task_id, || self.comments.list_for_task(task_id))
                .await?;
            debug!(task_id = %task_id, comments = comments.len(), "Warmed task comments");
            report.task_comments += 1;
        }

        info!(
            tasks = report.tasks,
            task_lists = report.task_lists,
            task_comments = report.task_comments,
            "Cache warmed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comment::NewComment;
    use crate::domain::task::{NewTask, TaskStatus};
    use crate::infrastructure::cache::CacheFactory;
    use crate::infrastructure::comment::InMemoryCommentRepository;
    use crate::infrastructure::task::InMemoryTaskRepository;

    fn new_task(creator: i64, assignee: Option<i64>) -> NewTask {
        NewTask {
            title: "warm me".to_string(),
            description: None,
            status: TaskStatus::Pending,
            created_by: UserId::new(creator),
            assigned_to: assignee.map(UserId::new),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_warm_populates_cache() {
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let comments = Arc::new(InMemoryCommentRepository::new());

        let first = tasks.create(new_task(1, Some(2))).await.unwrap();
        tasks.create(new_task(1, None)).await.unwrap();
        comments
            .create(NewComment {
                task_id: first.id(),
                user_id: UserId::new(2),
                content: "on it".to_string(),
            })
            .await
            .unwrap();

        let policy = TaskCachePolicy::new(Arc::new(CacheFactory::new().create_in_memory("test")));
        let warmer = CacheWarmer::new(tasks, comments, policy.clone());

        let report = warmer.warm().await.unwrap();

        assert_eq!(
            report,
            WarmReport {
                tasks: 2,
                task_lists: 2,
                task_comments: 2,
            }
        );
        assert_eq!(report.total(), 6);

        let cached: Option<Option<Task>> = policy.cache().get(&policy.task_key(first.id())).await.unwrap();
        assert_eq!(cached, Some(Some(first.clone())));

        let list_key = policy.task_list_key(USER_TASKS_ALL, &TaskListFilter::for_user(UserId::new(2)));
        let list: Option<Vec<Task>> = policy.cache().get(&list_key).await.unwrap();
        assert_eq!(list.map(|l| l.len()), Some(1));
    }

    #[tokio::test]
    async fn test_warm_empty_repositories() {
        let policy = TaskCachePolicy::new(Arc::new(CacheFactory::new().create_in_memory("test")));
        let warmer = CacheWarmer::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(InMemoryCommentRepository::new()),
            policy,
        );

        assert_eq!(warmer.warm().await.unwrap(), WarmReport::default());
    }
}
