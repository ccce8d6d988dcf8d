//! Update Abandoned Cart Settings Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};

use cartkeeper_app::domain::abandoned_carts::models::AbandonedCartSettings;

use crate::{
    abandoned_carts::{errors::into_status_error, responses::SettingsPayload},
    extensions::*,
    state::State,
};

/// Update Abandoned Cart Settings Handler
///
/// Replaces the tenant's recovery settings.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Update Abandoned Cart Settings",
    responses(
        (status_code = StatusCode::OK, description = "Recovery settings saved"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "abandoned_carts.settings.update",
    skip(json, depot),
    fields(tenant_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<SettingsPayload>,
    depot: &mut Depot,
) -> Result<Json<SettingsPayload>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    tracing::Span::current().record("tenant_uuid", tracing::field::display(tenant));

    let settings =
        AbandonedCartSettings::try_from(json.into_inner()).or_400("unknown discount type")?;

    let settings = state
        .app
        .abandoned_carts
        .update_settings(tenant, settings)
        .await
        .map_err(into_status_error)?;

    Ok(Json(settings.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use cartkeeper_app::domain::abandoned_carts::{
        AbandonedCartsServiceError, MockAbandonedCartsService, models::DiscountType,
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID};

    use super::*;

    fn route() -> Router {
        Router::with_path("abandoned-carts/settings").put(handler)
    }

    fn body(discount_type: &str) -> serde_json::Value {
        json!({
            "enabled": true,
            "abandonment_threshold_minutes": 30,
            "expiration_days": 14,
            "first_reminder_hours": 2,
            "second_reminder_hours": 24,
            "third_reminder_hours": 48,
            "max_reminders": 2,
            "offer_discount_on_reminder": 2,
            "discount_type": discount_type,
            "discount_value": 10,
            "discount_code": "SAVE10",
            "first_reminder_template": "first",
            "second_reminder_template": "second",
            "third_reminder_template": "third"
        })
    }

    #[tokio::test]
    async fn test_update_settings_saves_parsed_settings() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_update_settings()
            .once()
            .withf(|tenant, settings| {
                *tenant == TEST_TENANT_UUID
                    && settings.abandonment_threshold_minutes == 30
                    && settings.discount_type == Some(DiscountType::Percentage)
                    && settings.discount_code.as_deref() == Some("SAVE10")
            })
            .return_once(|_, settings| Ok(settings));

        let mut res = TestClient::put("http://example.com/abandoned-carts/settings")
            .json(&body("percentage"))
            .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let saved: SettingsPayload = res.take_json().await?;

        assert_eq!(saved.discount_type.as_deref(), Some("PERCENTAGE"));
        assert_eq!(saved.max_reminders, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_settings_unknown_discount_returns_400() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned.expect_update_settings().never();

        let res = TestClient::put("http://example.com/abandoned-carts/settings")
            .json(&body("free_shipping"))
            .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_settings_rejected_by_storage_returns_400() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_update_settings()
            .once()
            .return_once(|_, _| Err(AbandonedCartsServiceError::InvalidData));

        let res = TestClient::put("http://example.com/abandoned-carts/settings")
            .json(&body("fixed_amount"))
            .send(&Mocks::with_abandoned_carts(abandoned).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
