//! Data models for Gather

mod group;
mod message;
mod user;

pub use group::*;
pub use message::*;
pub use user::*;
