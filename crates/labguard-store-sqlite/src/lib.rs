//! SQLite backend for LabGuard.
//!
//! Implements both [`labguard_core::store::Registry`] and
//! [`labguard_core::store::IdentityProvider`] over one database file. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod identity;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
