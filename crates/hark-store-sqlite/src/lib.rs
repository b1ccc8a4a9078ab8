//! SQLite backend for the Hark contact store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Also provides the change-feed
//! capability: every committed contact mutation is published to a broadcast
//! channel that feed-mode realtime observers can subscribe to.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
