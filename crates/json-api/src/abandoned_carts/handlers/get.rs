//! Get Abandoned Cart Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    abandoned_carts::{errors::into_status_error, responses::AbandonedCartDetailsResponse},
    extensions::*,
    state::State,
};

/// Get Abandoned Cart Handler
///
/// Returns an abandoned cart together with its recovery attempts.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Get Abandoned Cart",
    responses(
        (status_code = StatusCode::OK, description = "Abandoned cart found"),
        (status_code = StatusCode::NOT_FOUND, description = "Abandoned cart not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    id: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<AbandonedCartDetailsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let details = state
        .app
        .abandoned_carts
        .get(tenant, id.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(details.into()))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use cartkeeper_app::domain::abandoned_carts::{
        AbandonedCartsServiceError, MockAbandonedCartsService,
        models::{
            AbandonedCartDetails, AbandonedCartStatus, RecoveryAttempt, RecoveryAttemptStatus,
            RecoveryAttemptUuid, RecoveryChannel,
        },
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID, make_abandoned_cart};

    use super::*;

    fn route() -> Router {
        Router::with_path("abandoned-carts/{id}").get(handler)
    }

    #[tokio::test]
    async fn test_get_includes_attempts() -> TestResult {
        let cart = make_abandoned_cart(AbandonedCartStatus::Reminded);
        let id = cart.uuid;

        let attempt = RecoveryAttempt {
            uuid: RecoveryAttemptUuid::new(),
            tenant_uuid: TEST_TENANT_UUID,
            abandoned_cart_uuid: id,
            channel: RecoveryChannel::Email,
            attempt_number: 1,
            status: RecoveryAttemptStatus::Sent,
            template_name: "abandoned_cart_reminder_1".to_string(),
            discount_code: None,
            external_id: Some("msg-1".to_string()),
            error_message: None,
            sent_at: Timestamp::now(),
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            created_at: Timestamp::now(),
        };

        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_get()
            .once()
            .withf(move |tenant, a| *tenant == TEST_TENANT_UUID && *a == id)
            .return_once(move |_, _| {
                Ok(AbandonedCartDetails {
                    cart,
                    attempts: vec![attempt],
                })
            });

        let mut res = TestClient::get(format!("http://example.com/abandoned-carts/{id}"))
            .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: AbandonedCartDetailsResponse = res.take_json().await?;

        assert_eq!(body.abandoned_cart.status, "REMINDED");
        assert_eq!(body.attempts.len(), 1);
        assert_eq!(
            body.attempts.first().map(|attempt| attempt.status.as_str()),
            Some("SENT")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_get_unknown_returns_404() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_get()
            .once()
            .return_once(|_, _| Err(AbandonedCartsServiceError::NotFound));

        let res = TestClient::get(format!(
            "http://example.com/abandoned-carts/{}",
            Uuid::now_v7()
        ))
        .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
