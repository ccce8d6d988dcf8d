//! Mark Recovered Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    abandoned_carts::{errors::into_status_error, requests::MarkRecoveredRequest},
    extensions::*,
    state::State,
};

/// Mark Recovered Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct MarkRecoveredResponse {
    /// `false` when the cart had no open abandoned cart to close
    pub recovered: bool,
}

/// Mark Recovered Handler
///
/// Called after an order is placed from a cart. Closes the cart's open
/// abandoned cart, if any, with the order details.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Mark Abandoned Cart Recovered",
    responses(
        (status_code = StatusCode::OK, description = "Recovery recorded"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "abandoned_carts.recovered",
    skip(json, depot),
    fields(
        tenant_uuid = tracing::field::Empty,
        cart_uuid = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<MarkRecoveredRequest>,
    depot: &mut Depot,
) -> Result<Json<MarkRecoveredResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let request = json.into_inner();
    let cart = request.cart_uuid;

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(tenant));
    span.record("cart_uuid", tracing::field::display(cart));

    let recovered = state
        .app
        .abandoned_carts
        .mark_recovered(tenant, cart.into(), request.into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(MarkRecoveredResponse { recovered }))
}
