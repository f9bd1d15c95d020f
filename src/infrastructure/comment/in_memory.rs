//! In-memory implementation of the comment repository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::domain::comment::{Comment, CommentId, CommentRepository, NewComment};
use crate::domain::task::TaskId;
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// In-memory comment repository with sequential IDs
#[derive(Debug)]
pub struct InMemoryCommentRepository {
    comments: RwLock<HashMap<CommentId, Comment>>,
    next_id: AtomicI64,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self {
            comments: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn with_comments(comments: Vec<Comment>) -> Self {
        let next_id = comments.iter().map(|c| c.id().value()).max().unwrap_or(0) + 1;
        let comments = comments.into_iter().map(|c| (c.id(), c)).collect();

        Self {
            comments: RwLock::new(comments),
            next_id: AtomicI64::new(next_id),
        }
    }

    fn filtered<P>(&self, predicate: P) -> Result<Vec<Comment>, DomainError>
    where
        P: Fn(&Comment) -> bool,
    {
        let comments = self
            .comments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut results: Vec<Comment> = comments.values().filter(|c| predicate(c)).cloned().collect();
        results.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });

        Ok(results)
    }
}

impl Default for InMemoryCommentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find(&self, id: CommentId) -> Result<Option<Comment>, DomainError> {
        let comments = self
            .comments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(comments.get(&id).cloned())
    }

    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let id = CommentId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let comment = Comment::new(id, comment);

        let mut comments = self
            .comments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, DomainError> {
        let mut comments = self
            .comments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if !comments.contains_key(&comment.id()) {
            return Err(DomainError::not_found(
                "comment",
                format!("Comment '{}' not found", comment.id()),
            ));
        }

        comments.insert(comment.id(), comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: CommentId) -> Result<bool, DomainError> {
        let mut comments = self
            .comments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        Ok(comments.remove(&id).is_some())
    }

    async fn list_for_task(&self, task_id: TaskId) -> Result<Vec<Comment>, DomainError> {
        self.filtered(|c| c.task_id() == task_id)
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Comment>, DomainError> {
        let mut comments = self.filtered(|c| c.user_id() == user)?;
        comments.reverse();
        Ok(comments)
    }
}
