//! Errors

use salvo::http::StatusError;
use tracing::error;

use cartkeeper_app::domain::carts::CartsServiceError;

pub(crate) fn into_status_error(error: CartsServiceError) -> StatusError {
    match error {
        CartsServiceError::NotFound => StatusError::not_found().brief("Cart not found"),
        CartsServiceError::ItemNotFound => StatusError::not_found().brief("Cart item not found"),
        CartsServiceError::AlreadyExists => StatusError::conflict().brief("Cart already exists"),
        CartsServiceError::Conflict => {
            StatusError::conflict().brief("Cart was modified concurrently, retry the request")
        }
        CartsServiceError::InvalidQuantity => {
            StatusError::bad_request().brief("Quantity must be greater than zero")
        }
        CartsServiceError::InvalidReference
        | CartsServiceError::MissingRequiredData
        | CartsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid cart payload")
        }
        CartsServiceError::MalformedItems(source) => {
            error!("stored cart items are malformed: {source}");

            StatusError::internal_server_error()
        }
        CartsServiceError::Encode(source) => {
            error!("failed to encode cart items: {source}");

            StatusError::internal_server_error()
        }
        CartsServiceError::Sql(source) => {
            error!("cart storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use serde::ser::Error as _;

    use super::*;

    #[test]
    fn lookups_and_conflicts_keep_their_meaning() {
        assert_eq!(
            into_status_error(CartsServiceError::NotFound).code,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            into_status_error(CartsServiceError::ItemNotFound).code,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            into_status_error(CartsServiceError::Conflict).code,
            StatusCode::CONFLICT
        );
        assert_eq!(
            into_status_error(CartsServiceError::InvalidQuantity).code,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            into_status_error(CartsServiceError::Encode(serde_json::Error::custom("boom"))).code,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
