//! Comment domain - comments on tasks and the "comment created" event

mod entity;
mod event;
mod repository;

pub use entity::{Comment, CommentId, NewComment};
pub use event::{CommentCreated, CommentNotifier};
pub use repository::CommentRepository;

#[cfg(test)]
pub use event::MockCommentNotifier;
