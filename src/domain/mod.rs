//! Domain layer - Core business types and contracts

pub mod cache;
pub mod comment;
pub mod error;
pub mod task;
pub mod user;

pub use cache::{
    CacheKeyParams, CacheStats, CacheStore, CacheStoreExt, KeyBuilder, TagIndex, TagSet,
    TagStrategy,
};
pub use comment::{Comment, CommentCreated, CommentId, CommentNotifier, CommentRepository, NewComment};
pub use error::{DomainError, FieldError};
pub use task::{NewTask, Task, TaskId, TaskRepository, TaskStatus};
pub use user::UserId;
