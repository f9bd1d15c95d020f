//! Comment notifier that records notifications in the log

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::comment::{CommentCreated, CommentNotifier};
use crate::domain::DomainError;

/// Logs a "new comment" notification for the task creator
#[derive(Debug, Default, Clone)]
pub struct LoggingCommentNotifier;

impl LoggingCommentNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommentNotifier for LoggingCommentNotifier {
    async fn comment_created(&self, event: &CommentCreated) -> Result<(), DomainError> {
        match event.recipient() {
            Some(recipient) => info!(
                recipient = %recipient,
                author = %event.author(),
                task_id = %event.task.id(),
                task_title = event.task.title(),
                comment_id = %event.comment.id(),
                "New comment on task"
            ),
            None => debug!(
                task_id = %event.task.id(),
                comment_id = %event.comment.id(),
                "Comment by task creator, no notification"
            ),
        }

        Ok(())
    }
}
