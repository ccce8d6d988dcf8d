//! Accept Price Changes Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, responses::CartChangeResponse},
    extensions::*,
    state::State,
};

/// Accept Price Changes Handler
///
/// Takes the current price as each repriced line's new price at add.
/// `affected` is the number of lines accepted.
#[endpoint(
    tags("carts"),
    summary = "Accept Price Changes",
    responses(
        (status_code = StatusCode::OK, description = "Cart updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::CONFLICT, description = "Cart was modified concurrently"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "carts.accept_prices",
    skip(customer, depot),
    fields(
        tenant_uuid = tracing::field::Empty,
        customer_uuid = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CartChangeResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let customer = customer.into_inner();

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(tenant));
    span.record("customer_uuid", tracing::field::display(customer));

    let change = state
        .app
        .carts
        .accept_price_changes(tenant, customer.into())
        .await
        .map_err(into_status_error)?;

    tracing::info!(affected = change.affected, "accepted cart lines");

    Ok(Json(change.into()))
}
