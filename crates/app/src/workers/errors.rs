//! Worker errors.

use thiserror::Error;

use crate::domain::{
    abandoned_carts::AbandonedCartsServiceError, carts::CartsServiceError,
    tenants::TenantsServiceError,
};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is already running")]
    AlreadyRunning,

    #[error("worker pool was closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("cart store failed")]
    Carts(#[from] CartsServiceError),

    #[error("abandoned cart store failed")]
    AbandonedCarts(#[from] AbandonedCartsServiceError),

    #[error("failed to list tenants")]
    Tenants(#[from] TenantsServiceError),
}
