//! Product Catalog
//!
//! Read-only view of the external product service, with a short-lived
//! per-tenant cache in front of the batch lookup.

pub mod client;
pub mod errors;
pub mod gateway;
pub mod models;

pub use errors::ProductGatewayError;
pub use gateway::*;
