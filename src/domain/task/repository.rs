//! Task repository trait

use async_trait::async_trait;

use super::{NewTask, Task, TaskId};
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Repository trait for Task persistence
#[async_trait]
pub trait TaskRepository: Send + Sync + std::fmt::Debug {
    /// Find a task by ID
    async fn find(&self, id: TaskId) -> Result<Option<Task>, DomainError>;

    /// Persist a new task, assigning its ID
    async fn create(&self, task: NewTask) -> Result<Task, DomainError>;

    /// Replace an existing task
    async fn update(&self, task: Task) -> Result<Task, DomainError>;

    /// Delete a task by ID, returning whether it existed
    async fn delete(&self, id: TaskId) -> Result<bool, DomainError>;

    /// All tasks, newest first
    async fn list(&self) -> Result<Vec<Task>, DomainError>;

    /// Tasks created by or assigned to the user, newest first
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Task>, DomainError>;
}
