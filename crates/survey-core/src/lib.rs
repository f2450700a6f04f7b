//! Core types and trait definitions for the site survey store.
//!
//! This crate is deliberately free of database and rendering dependencies.
//! The storage backend, the report engine and the CLI all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod address;
pub mod case;
pub mod entity;
pub mod error;
pub mod photo;
pub mod store;

pub use error::{Error, Result};
