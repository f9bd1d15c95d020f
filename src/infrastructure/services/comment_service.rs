//! Comment service - comments on tasks with cached listings

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::comment::{
    Comment, CommentCreated, CommentId, CommentNotifier, CommentRepository, NewComment,
};
use crate::domain::task::{TaskId, TaskRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;

use super::cache_policy::TaskCachePolicy;

/// Request to comment on a task
#[derive(Debug, Clone)]
pub struct CreateCommentRequest {
    pub task_id: TaskId,
    pub content: String,
}

/// Request to edit a comment
#[derive(Debug, Clone)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// Comment operations on behalf of an acting user
#[derive(Debug, Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    tasks: Arc<dyn TaskRepository>,
    notifier: Arc<dyn CommentNotifier>,
    cache: TaskCachePolicy,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        tasks: Arc<dyn TaskRepository>,
        notifier: Arc<dyn CommentNotifier>,
        cache: TaskCachePolicy,
    ) -> Self {
        Self {
            comments,
            tasks,
            notifier,
            cache,
        }
    }

    /// Adds a comment and tells the task creator about it
    ///
    /// Notification failures are logged and do not fail the request.
    pub async fn create(
        &self,
        actor: UserId,
        request: CreateCommentRequest,
    ) -> Result<Comment, DomainError> {
        let task = self.tasks.find(request.task_id).await?.ok_or_else(|| {
            DomainError::not_found_on(
                "task",
                "task_id",
                format!("Task '{}' not found", request.task_id),
            )
        })?;

        validate_content(&request.content)?;

        let comment = self
            .comments
            .create(NewComment {
                task_id: task.id(),
                user_id: actor,
                content: request.content,
            })
            .await?;

        self.cache
            .invalidate_comment_caches(task.id(), actor)
            .await?;

        info!(comment_id = %comment.id(), task_id = %task.id(), actor = %actor, "Comment created");

        let event = CommentCreated::new(comment.clone(), task);
        if let Err(e) = self.notifier.comment_created(&event).await {
            warn!(comment_id = %comment.id(), error = %e, "Failed to send comment notification");
        }

        Ok(comment)
    }

    pub async fn update(
        &self,
        actor: UserId,
        comment_id: CommentId,
        request: UpdateCommentRequest,
    ) -> Result<Comment, DomainError> {
        let mut comment = self.authored(actor, comment_id).await?;

        validate_content(&request.content)?;
        comment.set_content(request.content);

        let comment = self.comments.update(comment).await?;
        self.cache
            .invalidate_comment_caches(comment.task_id(), actor)
            .await?;

        info!(comment_id = %comment_id, actor = %actor, "Comment updated");
        Ok(comment)
    }

    pub async fn delete(&self, actor: UserId, comment_id: CommentId) -> Result<(), DomainError> {
        let comment = self.authored(actor, comment_id).await?;

        self.comments.delete(comment_id).await?;
        self.cache
            .invalidate_comment_caches(comment.task_id(), actor)
            .await?;

        info!(comment_id = %comment_id, actor = %actor, "Comment deleted");
        Ok(())
    }

    /// Any user may read any comment
    pub async fn get_by_id(
        &self,
        actor: UserId,
        comment_id: CommentId,
    ) -> Result<Comment, DomainError> {
        debug!(%actor, %comment_id, "Reading comment");
        self.find(comment_id).await
    }

    async fn find(&self, comment_id: CommentId) -> Result<Comment, DomainError> {
        self.comments
            .find(comment_id)
            .await?
            .ok_or_else(|| comment_not_found(comment_id))
    }

    /// Comments on a task, oldest first, read through the cache
    pub async fn comments_for_task(&self, task_id: TaskId) -> Result<Vec<Comment>, DomainError> {
        if self.tasks.find(task_id).await?.is_none() {
            return Err(DomainError::not_found(
                "task",
                format!("Task '{}' not found", task_id),
            ));
        }

        self.cache
            .cache_task_comments(task_id, || self.comments.list_for_task(task_id))
            .await
    }

    /// Comments written by `user_id`; users may only list their own
    pub async fn comments_by_user(
        &self,
        actor: UserId,
        user_id: UserId,
    ) -> Result<Vec<Comment>, DomainError> {
        if actor != user_id {
            return Err(DomainError::permission_denied(
                "user",
                "You can only view your own comments",
            ));
        }

        self.cache
            .cache_user_comments(user_id, || self.comments.list_by_user(user_id))
            .await
    }

    async fn authored(&self, actor: UserId, comment_id: CommentId) -> Result<Comment, DomainError> {
        let comment = self.find(comment_id).await?;

        if !comment.is_authored_by(actor) {
            return Err(DomainError::permission_denied(
                "comment",
                "You can only modify your own comments",
            ));
        }

        Ok(comment)
    }
}

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("content", "Comment content is required"));
    }

    Ok(())
}

fn comment_not_found(comment_id: CommentId) -> DomainError {
    DomainError::not_found("comment", format!("Comment '{}' not found", comment_id))
}
