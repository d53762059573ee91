//! SQLite backend for the landing report store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every report is written together with
//! its child rows in a single transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::SCHEMA;
pub use store::SqliteStore;
