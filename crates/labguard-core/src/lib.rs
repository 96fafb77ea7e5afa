//! Core types and trait definitions for LabGuard.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! sample lifecycle state machine and the authorization rules live here;
//! backends and the HTTP surface depend on it.

pub mod account;
pub mod credential;
pub mod enrich;
pub mod error;
pub mod lifecycle;
pub mod role;
pub mod sample;
pub mod store;

pub use error::{Error, Result};
