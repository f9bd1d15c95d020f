//! Comment repository trait

use async_trait::async_trait;

use super::{Comment, CommentId, NewComment};
use crate::domain::task::TaskId;
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Repository trait for Comment persistence
#[async_trait]
pub trait CommentRepository: Send + Sync + std::fmt::Debug {
    async fn find(&self, id: CommentId) -> Result<Option<Comment>, DomainError>;

    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError>;

    async fn update(&self, comment: Comment) -> Result<Comment, DomainError>;

    async fn delete(&self, id: CommentId) -> Result<bool, DomainError>;

    /// Comments on a task, oldest first
    async fn list_for_task(&self, task_id: TaskId) -> Result<Vec<Comment>, DomainError>;

    /// Comments written by a user, newest first
    async fn list_by_user(&self, user: UserId) -> Result<Vec<Comment>, DomainError>;
}
