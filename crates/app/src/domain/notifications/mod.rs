//! Customer Notifications
//!
//! Outbound reminder emails, delivered by the external notification service.

pub mod client;
pub mod errors;
pub mod models;

pub use client::*;
pub use errors::NotificationError;
