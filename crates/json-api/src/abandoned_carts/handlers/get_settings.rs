//! Get Abandoned Cart Settings Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    abandoned_carts::{errors::into_status_error, responses::SettingsPayload},
    extensions::*,
    state::State,
};

/// Get Abandoned Cart Settings Handler
///
/// Returns the tenant's recovery settings, or the defaults when none were
/// saved.
#[endpoint(
    tags("abandoned-carts"),
    summary = "Get Abandoned Cart Settings",
    responses(
        (status_code = StatusCode::OK, description = "Recovery settings"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<SettingsPayload>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let settings = state
        .app
        .abandoned_carts
        .get_settings(tenant)
        .await
        .map_err(into_status_error)?;

    Ok(Json(settings.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use cartkeeper_app::domain::abandoned_carts::{
        MockAbandonedCartsService, models::AbandonedCartSettings,
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID};

    use super::*;

    #[tokio::test]
    async fn test_get_settings_returns_defaults() -> TestResult {
        let mut abandoned = MockAbandonedCartsService::new();

        abandoned
            .expect_get_settings()
            .once()
            .withf(|tenant| *tenant == TEST_TENANT_UUID)
            .return_once(|_| Ok(AbandonedCartSettings::default()));

        let mut res = TestClient::get("http://example.com/abandoned-carts/settings")
            .send(
                &Mocks::with_abandoned_carts(abandoned)
                    .service(Router::with_path("abandoned-carts/settings").get(handler)),
            )
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: SettingsPayload = res.take_json().await?;

        assert!(body.enabled, "recovery is on by default");
        assert_eq!(body.abandonment_threshold_minutes, 60);
        assert_eq!(body.max_reminders, 3);
        assert_eq!(body.offer_discount_on_reminder, 2);
        assert!(body.discount_type.is_none(), "no discount by default");

        Ok(())
    }
}
