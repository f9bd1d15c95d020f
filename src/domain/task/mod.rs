//! Task domain - tasks, statuses and persistence contract

mod entity;
mod repository;

pub use entity::{NewTask, Task, TaskId, TaskStatus};
pub use repository::TaskRepository;
