//! Detect Abandoned Carts Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    abandoned_carts::{errors::into_status_error, responses::CountResponse},
    extensions::*,
    state::State,
};

/// Detect Abandoned Carts Handler
///
/// Records every cart idle past the tenant's threshold that has no open
/// abandoned cart yet.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Detect Abandoned Carts",
    responses(
        (status_code = StatusCode::OK, description = "Abandoned carts detected"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CountResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let count = state
        .app
        .abandoned_carts
        .detect(tenant)
        .await
        .map_err(into_status_error)?;

    tracing::info!(tenant = %tenant, count, "detected abandoned carts");

    Ok(Json(CountResponse { count }))
}
