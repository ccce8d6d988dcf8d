//! Tenants service errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenantsServiceError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),
}
