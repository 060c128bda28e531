//! Gather Core Library
//!
//! Models, auto-expiry policy, and SQLite storage for the Gather chat
//! platform.

pub mod error;
pub mod expiry;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
pub use models::*;
pub use storage::{ChatStore, Database, GroupStore, UserStore};
