//! Catalog event ingestion.
//!
//! With the in-memory transport, the catalog services post their product and
//! inventory events here and they are handed to the same listeners a broker
//! would feed.

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use serde_json::Value;

use cartkeeper_app::events::models::EventStream;

use crate::{extensions::*, state::State};

/// Ingest Event Handler
///
/// Queues one catalog event on the `products` or `inventory` stream.
#[endpoint(
    tags("events"),
    summary = "Ingest Event",
    responses(
        (status_code = StatusCode::ACCEPTED, description = "Event queued"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown stream"),
        (status_code = StatusCode::SERVICE_UNAVAILABLE, description = "Events are not consumed in process"),
    ),
)]
#[tracing::instrument(
    name = "events.ingest",
    skip(stream, req, depot),
    fields(stream = tracing::field::Empty, subject = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    stream: PathParam<String>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<StatusCode, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let stream = parse_stream(&stream.into_inner())
        .ok_or_else(|| StatusError::not_found().brief("Unknown event stream"))?;

    let event: Value = req.parse_json().await.or_400("Invalid event payload")?;

    let subject = subject_of(stream, &event)
        .ok_or_else(|| StatusError::bad_request().brief("Event has no eventType"))?;

    let span = tracing::Span::current();

    span.record("stream", stream.as_str());
    span.record("subject", subject.as_str());

    let publisher = state
        .background
        .as_ref()
        .and_then(|background| background.publisher(stream))
        .ok_or_else(|| {
            StatusError::service_unavailable().brief("Events are not consumed in process")
        })?;

    let payload = serde_json::to_vec(&event).or_500("failed to encode event")?;

    if !publisher.publish(&subject, payload).await {
        return Err(StatusError::service_unavailable().brief("Event listener has stopped"));
    }

    Ok(StatusCode::ACCEPTED)
}

fn parse_stream(name: &str) -> Option<EventStream> {
    [EventStream::Products, EventStream::Inventory]
        .into_iter()
        .find(|stream| stream.consumer_suffix() == name)
}

/// Broker subject for an event, e.g. `product.deleted`.
fn subject_of(stream: EventStream, event: &Value) -> Option<String> {
    let event_type = event.get("eventType")?.as_str()?;

    if event_type.contains('.') {
        Some(event_type.to_string())
    } else {
        Some(format!("{}.{event_type}", stream.subject_prefix()))
    }
}
