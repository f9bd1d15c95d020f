//! In-memory implementation of the task repository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::domain::task::{NewTask, Task, TaskId, TaskRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// In-memory task repository with sequential IDs
#[derive(Debug)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<TaskId, Task>>,
    next_id: AtomicI64,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a repository holding existing tasks; new IDs continue after the highest one
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id().value()).max().unwrap_or(0) + 1;
        let tasks = tasks.into_iter().map(|t| (t.id(), t)).collect();

        Self {
            tasks: RwLock::new(tasks),
            next_id: AtomicI64::new(next_id),
        }
    }

    fn newest_first(mut tasks: Vec<Task>) -> Vec<Task> {
        tasks.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        tasks
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, DomainError> {
        let tasks = self
            .tasks
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tasks.get(&id).cloned())
    }

    async fn create(&self, task: NewTask) -> Result<Task, DomainError> {
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let task = Task::new(id, task);

        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Task, DomainError> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if !tasks.contains_key(&task.id()) {
            return Err(DomainError::not_found(
                "task",
                format!("Task '{}' not found", task.id()),
            ));
        }

        tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> Result<bool, DomainError> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        Ok(tasks.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Task>, DomainError> {
        let tasks = self
            .tasks
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(Self::newest_first(tasks.values().cloned().collect()))
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Task>, DomainError> {
        let tasks = self
            .tasks
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(Self::newest_first(
            tasks
                .values()
                .filter(|t| t.is_participant(user))
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskStatus;

    fn new_task(title: &str, creator: i64, assignee: Option<i64>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            created_by: UserId::new(creator),
            assigned_to: assignee.map(UserId::new),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = InMemoryTaskRepository::new();

        let first = repo.create(new_task("a", 1, None)).await.unwrap();
        let second = repo.create(new_task("b", 1, None)).await.unwrap();

        assert_eq!(first.id(), TaskId::new(1));
        assert_eq!(second.id(), TaskId::new(2));
        assert_eq!(repo.find(first.id()).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let repo = InMemoryTaskRepository::new();
        let task = Task::new(TaskId::new(42), new_task("ghost", 1, None));

        let result = repo.update(task).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryTaskRepository::new();
        let task = repo.create(new_task("a", 1, None)).await.unwrap();

        assert!(repo.delete(task.id()).await.unwrap());
        assert!(!repo.delete(task.id()).await.unwrap());
        assert!(repo.find(task.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_includes_assigned_newest_first() {
        let repo = InMemoryTaskRepository::new();
        repo.create(new_task("mine", 1, None)).await.unwrap();
        repo.create(new_task("other", 2, None)).await.unwrap();
        repo.create(new_task("assigned", 2, Some(1))).await.unwrap();

        let titles: Vec<String> = repo
            .list_for_user(UserId::new(1))
            .await
            .unwrap()
            .iter()
            .map(|t| t.title().to_string())
            .collect();

        assert_eq!(titles, vec!["assigned", "mine"]);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_with_tasks_continues_ids() {
        let seeded = Task::new(TaskId::new(10), new_task("seed", 1, None));
        let repo = InMemoryTaskRepository::with_tasks(vec![seeded]);

        let created = repo.create(new_task("next", 1, None)).await.unwrap();
        assert_eq!(created.id(), TaskId::new(11));
    }
}
