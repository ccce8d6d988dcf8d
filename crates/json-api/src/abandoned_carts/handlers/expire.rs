//! Expire Abandoned Carts Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    abandoned_carts::{errors::into_status_error, responses::CountResponse},
    extensions::*,
    state::State,
};

/// Expire Abandoned Carts Handler
///
/// Closes open abandoned carts older than the tenant's expiration window.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Expire Abandoned Carts",
    responses(
        (status_code = StatusCode::OK, description = "Abandoned carts expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CountResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let count = state
        .app
        .abandoned_carts
        .expire(tenant)
        .await
        .map_err(into_status_error)?;

    tracing::info!(tenant = %tenant, count, "expired abandoned carts");

    Ok(Json(CountResponse { count }))
}
