//! Session management.
//!
//! Each session owns one identity context. The store is in-memory with
//! TTL expiry and a background cleanup task.

pub mod cleanup;
pub mod store;
pub mod types;

pub use cleanup::{spawn_cleanup_task, DEFAULT_CLEANUP_INTERVAL_SECS};
pub use store::{SessionStore, DEFAULT_MAX_SESSIONS};
pub use types::{Session, SessionId};
