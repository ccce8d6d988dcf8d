//! Abandoned Carts

pub mod data;
pub mod errors;
pub mod models;
pub mod records;
mod repository;
pub mod service;
pub mod store;

pub use errors::AbandonedCartsServiceError;
pub use service::*;
pub use store::*;
