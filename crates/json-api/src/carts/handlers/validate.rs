//! Validate Cart Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, responses::ValidationResponse},
    extensions::*,
    state::State,
};

/// Validate Cart Handler
///
/// Checks every line against the catalog, stores the refreshed statuses and
/// returns the outcome.
#[endpoint(
    tags("carts"),
    summary = "Validate Cart",
    responses(
        (status_code = StatusCode::OK, description = "Cart validated"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<ValidationResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let result = state
        .app
        .validator
        .validate(tenant, customer.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(result.into()))
}
