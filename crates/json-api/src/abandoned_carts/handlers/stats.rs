//! Abandoned Cart Stats Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{oapi::extract::QueryParam, prelude::*};

use crate::{
    abandoned_carts::{errors::into_status_error, responses::AbandonedCartStatsResponse},
    extensions::*,
    state::State,
};

/// Abandoned Cart Stats Handler
///
/// Recovery figures for abandonments in `[from, to]`. Either bound may be
/// omitted. The pending count covers every open record.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Abandoned Cart Stats",
    responses(
        (status_code = StatusCode::OK, description = "Recovery statistics"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    from: QueryParam<String, false>,
    to: QueryParam<String, false>,
    depot: &mut Depot,
) -> Result<Json<AbandonedCartStatsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let from = from.parse_or_400::<Timestamp>("from")?;
    let to = to.parse_or_400::<Timestamp>("to")?;

    let stats = state
        .app
        .abandoned_carts
        .stats(tenant, from, to)
        .await
        .map_err(into_status_error)?;

    Ok(Json(stats.into()))
}
