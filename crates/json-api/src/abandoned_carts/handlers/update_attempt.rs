//! Update Recovery Attempt Status Handler

use std::sync::Arc;

use salvo::{
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use uuid::Uuid;

use cartkeeper_app::domain::abandoned_carts::models::RecoveryAttemptStatus;

use crate::{
    abandoned_carts::{
        errors::into_status_error, requests::UpdateAttemptStatusRequest,
        responses::RecoveryAttemptResponse,
    },
    extensions::*,
    state::State,
};

/// Update Recovery Attempt Status Handler
///
/// Records delivery feedback for a reminder. Statuses only move forward:
/// `SENT`, `DELIVERED`, `OPENED`, `CLICKED`, with `FAILED` reachable before
/// a click.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Update Recovery Attempt Status",
    responses(
        (status_code = StatusCode::OK, description = "Attempt updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Attempt not found"),
        (status_code = StatusCode::CONFLICT, description = "Status cannot move backwards"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    attempt: PathParam<Uuid>,
    json: JsonBody<UpdateAttemptStatusRequest>,
    depot: &mut Depot,
) -> Result<Json<RecoveryAttemptResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let request = json.into_inner();

    let status = request
        .status
        .parse::<RecoveryAttemptStatus>()
        .or_400("unknown attempt status")?;

    let attempt = state
        .app
        .abandoned_carts
        .update_attempt_status(
            tenant,
            attempt.into_inner().into(),
            status,
            request.error_message,
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(attempt.into()))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use cartkeeper_app::domain::abandoned_carts::{
        AbandonedCartsServiceError, MockAbandonedCartsService,
        models::{AbandonedCartUuid, RecoveryAttempt, RecoveryAttemptUuid, RecoveryChannel},
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID};

    use super::*;

    fn route() -> Router {
        Router::with_path("abandoned-carts/attempts/{attempt}/status").put(handler)
    }

    #[tokio::test]
    async fn test_update_attempt_to_opened() -> TestResult {
        let uuid = RecoveryAttemptUuid::new();
        let now = Timestamp::now();

        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_update_attempt_status()
            .once()
            .withf(move |tenant, a, status, error| {
                *tenant == TEST_TENANT_UUID
                    && *a == uuid
                    && *status == RecoveryAttemptStatus::Opened
                    && error.is_none()
            })
            .return_once(move |_, _, status, _| {
                Ok(RecoveryAttempt {
                    uuid,
                    tenant_uuid: TEST_TENANT_UUID,
                    abandoned_cart_uuid: AbandonedCartUuid::new(),
                    channel: RecoveryChannel::Email,
                    attempt_number: 2,
                    status,
                    template_name: "abandoned_cart_reminder_2".to_string(),
                    discount_code: Some("SAVE10".to_string()),
                    external_id: None,
                    error_message: None,
                    sent_at: now,
                    delivered_at: None,
                    opened_at: Some(now),
                    clicked_at: None,
                    created_at: now,
                })
            });

        let mut res = TestClient::put(format!(
            "http://example.com/abandoned-carts/attempts/{uuid}/status"
        ))
        .json(&json!({ "status": "opened" }))
        .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: RecoveryAttemptResponse = res.take_json().await?;

        assert_eq!(body.status, "OPENED");
        assert!(body.opened_at.is_some(), "opened timestamp is stamped");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_attempt_backwards_returns_409() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_update_attempt_status()
            .once()
            .return_once(|_, _, _, _| {
                Err(AbandonedCartsServiceError::InvalidTransition {
                    from: "CLICKED".to_string(),
                    to: "DELIVERED".to_string(),
                })
            });

        let res = TestClient::put(format!(
            "http://example.com/abandoned-carts/attempts/{}/status",
            RecoveryAttemptUuid::new()
        ))
        .json(&json!({ "status": "DELIVERED" }))
        .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_attempt_unknown_status_returns_400() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned.expect_update_attempt_status().never();

        let res = TestClient::put(format!(
            "http://example.com/abandoned-carts/attempts/{}/status",
            RecoveryAttemptUuid::new()
        ))
        .json(&json!({ "status": "BOUNCED" }))
        .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
