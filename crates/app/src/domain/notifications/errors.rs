//! Notification Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The notification service returned a non-2xx response.
    #[error("unexpected response from notification service: {0}")]
    UnexpectedResponse(String),
}
