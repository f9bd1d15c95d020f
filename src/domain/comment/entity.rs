//! Comment entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::task::TaskId;
use crate::domain::user::UserId;

/// Comment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(i64);

impl CommentId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields required to persist a new comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub content: String,
}

/// A comment left by a user on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    id: CommentId,
    task_id: TaskId,
    user_id: UserId,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(id: CommentId, comment: NewComment) -> Self {
        let now = Utc::now();
        Self {
            id,
            task_id: comment.task_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> CommentId {
        self.id
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Only the author may modify a comment
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.user_id == user
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.updated_at = Utc::now();
    }
}
