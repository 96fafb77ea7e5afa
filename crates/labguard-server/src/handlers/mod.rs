//! Route handlers, grouped by resource.

pub mod admin;
pub mod samples;
pub mod session;
