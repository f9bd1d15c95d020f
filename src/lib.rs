//! Taskboard
//!
//! Task and comment services for a task-management backend, with:
//! - A cache facade over in-memory (moka) or Redis stores
//! - Tag-based invalidation, native on Redis and locally tracked otherwise
//! - Per-entity cache policies and a cache warmer
//! - A cache management CLI

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use infrastructure::cache::{CacheConfig, CacheFactory, CacheType};
pub use infrastructure::services::{CacheService, CommentService, TaskCachePolicy, TaskService};
