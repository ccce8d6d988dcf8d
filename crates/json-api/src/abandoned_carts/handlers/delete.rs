//! Delete Abandoned Cart Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{abandoned_carts::errors::into_status_error, extensions::*, state::State};

/// Delete Abandoned Cart Handler
///
/// Removes the record and its recovery attempts. The live cart is untouched.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Delete Abandoned Cart",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Abandoned cart deleted"),
        (status_code = StatusCode::NOT_FOUND, description = "Abandoned cart not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "abandoned_carts.delete",
    skip(id, depot),
    fields(
        tenant_uuid = tracing::field::Empty,
        abandoned_cart_uuid = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    id: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<StatusCode, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let id = id.into_inner();

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(tenant));
    span.record("abandoned_cart_uuid", tracing::field::display(id));

    state
        .app
        .abandoned_carts
        .delete(tenant, id.into())
        .await
        .map_err(into_status_error)?;

    tracing::info!(abandoned_cart_uuid = %id, "deleted abandoned cart");

    Ok(StatusCode::NO_CONTENT)
}
