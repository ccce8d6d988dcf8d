//! Abandoned carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{
    abandoned_carts::models::UnknownStatus,
    carts::{CartsServiceError, models::ItemsDocumentError},
};

#[derive(Debug, Error)]
pub enum AbandonedCartsServiceError {
    #[error("abandoned cart already exists")]
    AlreadyExists,

    #[error("abandoned cart not found")]
    NotFound,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("status cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("unknown status in storage")]
    UnknownStatus(#[from] UnknownStatus),

    #[error("cart store failed")]
    Carts(#[from] CartsServiceError),

    #[error("snapshot items are malformed")]
    MalformedItems(#[from] ItemsDocumentError),

    #[error("failed to encode snapshot items")]
    Encode(#[from] serde_json::Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for AbandonedCartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
