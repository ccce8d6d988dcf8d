//! Cartkeeper Domain Concerns

pub mod abandoned_carts;
pub mod carts;
pub mod catalog;
pub mod customers;
pub mod notifications;
pub mod tenants;
pub mod validation;
