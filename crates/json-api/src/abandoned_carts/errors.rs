//! Errors

use salvo::http::StatusError;
use tracing::error;

use cartkeeper_app::domain::abandoned_carts::AbandonedCartsServiceError;

pub(crate) fn into_status_error(error: AbandonedCartsServiceError) -> StatusError {
    match error {
        AbandonedCartsServiceError::NotFound => {
            StatusError::not_found().brief("Abandoned cart not found")
        }
        AbandonedCartsServiceError::AlreadyExists => {
            StatusError::conflict().brief("Abandoned cart already exists")
        }
        AbandonedCartsServiceError::InvalidTransition { from, to } => {
            StatusError::conflict().brief(format!("Status cannot move from {from} to {to}"))
        }
        AbandonedCartsServiceError::InvalidReference
        | AbandonedCartsServiceError::MissingRequiredData
        | AbandonedCartsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid abandoned cart payload")
        }
        AbandonedCartsServiceError::Carts(source) => crate::carts::errors::into_status_error(source),
        AbandonedCartsServiceError::UnknownStatus(source) => {
            error!("stored abandoned cart has an unknown status: {source}");

            StatusError::internal_server_error()
        }
        AbandonedCartsServiceError::MalformedItems(source) => {
            error!("abandoned cart snapshot is malformed: {source}");

            StatusError::internal_server_error()
        }
        AbandonedCartsServiceError::Encode(source) => {
            error!("failed to encode abandoned cart snapshot: {source}");

            StatusError::internal_server_error()
        }
        AbandonedCartsServiceError::Sql(source) => {
            error!("abandoned cart storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}
