//! Background Workers
//!
//! Periodic passes over the cart store: catalog reconciliation, expiry and the
//! abandoned cart sweep. Each worker can be started on a schedule, stopped
//! gracefully or run once on demand.

pub mod abandonment;
pub mod errors;
pub mod expiration;
pub mod reconciliation;
mod runner;

pub use abandonment::{AbandonmentConfig, AbandonmentRun, AbandonmentStats, AbandonmentWorker};
pub use errors::WorkerError;
pub use expiration::{ExpirationConfig, ExpirationRun, ExpirationStats, ExpirationWorker};
pub use reconciliation::{
    ReconciliationConfig, ReconciliationRun, ReconciliationStats, ReconciliationWorker,
};
pub use runner::WorkerStatus;
