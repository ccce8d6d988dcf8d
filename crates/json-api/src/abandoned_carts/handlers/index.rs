//! List Abandoned Carts Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{oapi::extract::QueryParam, prelude::*};
use uuid::Uuid;

use cartkeeper_app::domain::abandoned_carts::models::{
    AbandonedCartFilter, AbandonedCartSort, AbandonedCartStatus, SortOrder,
};

use crate::{
    abandoned_carts::{errors::into_status_error, responses::AbandonedCartPageResponse},
    extensions::*,
    state::State,
};

/// List Abandoned Carts Handler
///
/// Pages through a tenant's abandoned carts. Defaults to 20 per page, newest
/// abandonment first.
#[endpoint(
    tags("abandoned-carts"),
    summary = "List Abandoned Carts",
    responses(
        (status_code = StatusCode::OK, description = "Abandoned carts"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[expect(
    clippy::too_many_arguments,
    reason = "each query parameter is a separate extractor"
)]
pub(crate) async fn handler(
    customer: QueryParam<String, false>,
    status: QueryParam<String, false>,
    abandoned_from: QueryParam<String, false>,
    abandoned_to: QueryParam<String, false>,
    min_value: QueryParam<u64, false>,
    max_value: QueryParam<u64, false>,
    page: QueryParam<u32, false>,
    limit: QueryParam<u32, false>,
    sort: QueryParam<String, false>,
    order: QueryParam<String, false>,
    depot: &mut Depot,
) -> Result<Json<AbandonedCartPageResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let filter = AbandonedCartFilter {
        customer: customer.parse_or_400::<Uuid>("customer")?.map(Into::into),
        status: status.parse_or_400::<AbandonedCartStatus>("status")?,
        abandoned_from: abandoned_from.parse_or_400::<Timestamp>("abandoned_from")?,
        abandoned_to: abandoned_to.parse_or_400::<Timestamp>("abandoned_to")?,
        min_value: min_value.into_inner(),
        max_value: max_value.into_inner(),
        page: page.into_inner(),
        limit: limit.into_inner(),
        sort: sort
            .parse_or_400::<AbandonedCartSort>("sort")?
            .unwrap_or_default(),
        order: order.parse_or_400::<SortOrder>("order")?.unwrap_or_default(),
    };

    let page = state
        .app
        .abandoned_carts
        .list(tenant, filter)
        .await
        .map_err(into_status_error)?;

    Ok(Json(page.into()))
}
