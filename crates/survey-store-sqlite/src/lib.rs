//! SQLite backend for the survey store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every committed write is announced on
//! a change feed that [`Watch`] subscriptions turn into fresh snapshots.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod watch;

pub use error::{Error, Result};
pub use store::SqliteStore;
pub use watch::{Change, Snapshot, Watch};

#[cfg(test)]
mod tests;
