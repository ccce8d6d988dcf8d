//! Cart Validation
//!
//! Re-checks cart lines against the live catalog and records what changed.

pub mod models;
pub mod rules;
pub mod service;

pub use service::*;
