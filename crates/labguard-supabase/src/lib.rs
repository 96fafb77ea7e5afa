//! Hosted backend for LabGuard.
//!
//! Talks to a Supabase project over HTTP: PostgREST (`/rest/v1`) for the
//! registry and GoTrue (`/auth/v1`) for identity. Two clients are built
//! explicitly from configuration. The service tier carries the service-role
//! key and is used for all registry access and account provisioning. The
//! anonymous tier carries the public key and is used wherever an end user's
//! own credential is presented.

mod auth;
mod client;
mod rest;

pub mod error;

pub use client::{SupabaseBackend, SupabaseConfig};
pub use error::{Error, Result};
