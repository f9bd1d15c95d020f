//! Comment infrastructure - repository and notifier implementations

mod in_memory;
mod notifier;

pub use in_memory::InMemoryCommentRepository;
pub use notifier::LoggingCommentNotifier;
