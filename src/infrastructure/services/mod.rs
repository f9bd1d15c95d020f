//! Infrastructure services

mod cache_policy;
mod cache_service;
mod cache_warmer;
mod comment_service;
mod task_service;

pub use cache_policy::{
    status_tag, task_comments_tag, task_tag, user_tag, TaskCacheInvalidation, TaskCachePolicy,
    TaskListFilter, COMMENTS_TAG, COMMENT_TTL, DASHBOARD_TAG, TASKS_TAG, TASK_LIST_TAG, TASK_TTL,
};
pub use cache_service::CacheService;
pub use cache_warmer::{CacheWarmer, WarmReport};
pub use comment_service::{CommentService, CreateCommentRequest, UpdateCommentRequest};
pub use task_service::{
    CreateTaskRequest, TaskService, UpdateTaskRequest, USER_TASKS_ALL, USER_TASKS_SPECIFIC,
};
