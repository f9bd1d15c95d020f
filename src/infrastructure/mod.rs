//! Infrastructure layer - store, repository and service implementations

pub mod cache;
pub mod comment;
pub mod logging;
pub mod services;
pub mod task;
