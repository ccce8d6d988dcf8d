//! Event handling errors.

use thiserror::Error;

use crate::domain::carts::CartsServiceError;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event payload could not be decoded")]
    Decode(#[from] serde_json::Error),

    #[error("event price is not a valid amount")]
    InvalidPrice,

    #[error("cart update failed")]
    Carts(#[from] CartsServiceError),

    #[error("handler did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("event transport failed: {0}")]
    Transport(String),

    #[error("failed to store dead letter")]
    Sql(#[from] sqlx::Error),
}

impl EventError {
    /// Whether another delivery of the same payload could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::InvalidPrice)
    }
}
