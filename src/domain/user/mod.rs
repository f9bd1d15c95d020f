//! User domain
//!
//! Authentication lives outside this crate; services only need the acting
//! user's identifier.

mod entity;

pub use entity::UserId;
