//! Comment created event and its listener

use async_trait::async_trait;

use super::Comment;
use crate::domain::task::Task;
use crate::domain::user::UserId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Raised after a comment has been persisted
#[derive(Debug, Clone)]
pub struct CommentCreated {
    pub comment: Comment,
    pub task: Task,
}

impl CommentCreated {
    pub fn new(comment: Comment, task: Task) -> Self {
        Self { comment, task }
    }

    pub fn author(&self) -> UserId {
        self.comment.user_id()
    }

    /// The task creator, unless they wrote the comment themselves
    pub fn recipient(&self) -> Option<UserId> {
        let creator = self.task.created_by();
        (creator != self.author()).then_some(creator)
    }
}

/// Receives comment events, e.g. to notify the task owner
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommentNotifier: Send + Sync + std::fmt::Debug {
    async fn comment_created(&self, event: &CommentCreated) -> Result<(), DomainError>;
}
