//! Send Reminders Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};

use crate::{
    abandoned_carts::{
        errors::into_status_error, requests::SendRemindersRequest, responses::ReminderRunResponse,
    },
    extensions::*,
    state::State,
};

/// Send Reminders Handler
///
/// Sends the next reminder for the listed abandoned carts, or for every
/// record whose reminder is due when `abandoned_cart_uuids` is omitted.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Send Reminders",
    responses(
        (status_code = StatusCode::OK, description = "Reminder run summary"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "abandoned_carts.send_reminders",
    skip(json, depot),
    fields(tenant_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<SendRemindersRequest>,
    depot: &mut Depot,
) -> Result<Json<ReminderRunResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    tracing::Span::current().record("tenant_uuid", tracing::field::display(tenant));

    let targets = json
        .into_inner()
        .abandoned_cart_uuids
        .map(|uuids| uuids.into_iter().map(Into::into).collect());

    let run = state
        .app
        .abandoned_carts
        .send_reminders(tenant, targets)
        .await
        .map_err(into_status_error)?;

    tracing::info!(
        sent = run.sent,
        failed = run.failed,
        skipped = run.skipped,
        "reminder run finished"
    );

    Ok(Json(run.into()))
}
