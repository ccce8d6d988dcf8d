//! Product Gateway Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProductGatewayError {
    /// An HTTP transport or decoding error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The product service returned a non-2xx response or an unexpected body.
    #[error("unexpected response from product service: {0}")]
    UnexpectedResponse(String),
}
