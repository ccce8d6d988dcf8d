//! Remove Unavailable Items Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, responses::CartChangeResponse},
    extensions::*,
    state::State,
};

/// Remove Unavailable Items Handler
///
/// Drops every line that can no longer be purchased. `affected` is the
/// number of lines removed.
#[endpoint(
    tags("carts"),
    summary = "Remove Unavailable Items",
    responses(
        (status_code = StatusCode::OK, description = "Cart updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::CONFLICT, description = "Cart was modified concurrently"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "carts.remove_unavailable",
    skip(customer, depot),
    fields(
        tenant_uuid = tracing::field::Empty,
        customer_uuid = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CartChangeResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let customer = customer.into_inner();

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(tenant));
    span.record("customer_uuid", tracing::field::display(customer));

    let change = state
        .app
        .carts
        .remove_unavailable_items(tenant, customer.into())
        .await
        .map_err(into_status_error)?;

    tracing::info!(affected = change.affected, "removed cart lines");

    Ok(Json(change.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use cartkeeper_app::domain::{
        carts::{CartsServiceError, MockCartsService, models::CartChange},
        customers::records::CustomerUuid,
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID, make_cart, make_item};

    use super::*;

    fn route() -> Router {
        Router::with_path("customers/{customer}/cart/remove-unavailable").post(handler)
    }

    #[tokio::test]
    async fn test_remove_unavailable_reports_removed_count() -> TestResult {
        let customer = CustomerUuid::new();
        let cart = make_cart(customer, vec![make_item("sku-1", 900, 1)]);

        let mut carts = MockCartsService::new();

        carts
            .expect_remove_unavailable_items()
            .once()
            .withf(move |tenant, c| *tenant == TEST_TENANT_UUID && *c == customer)
            .return_once(move |_, _| Ok(CartChange { cart, affected: 2 }));

        let mut res = TestClient::post(format!(
            "http://example.com/customers/{customer}/cart/remove-unavailable"
        ))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: CartChangeResponse = res.take_json().await?;

        assert_eq!(body.affected, 2);
        assert_eq!(body.cart.items.len(), 1);
        assert!(!body.cart.has_unavailable_items, "remaining line is available");

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_unavailable_missing_cart_returns_404() -> TestResult {
        let customer = CustomerUuid::new();

        let mut carts = MockCartsService::new();

        carts
            .expect_remove_unavailable_items()
            .once()
            .return_once(|_, _| Err(CartsServiceError::NotFound));

        let res = TestClient::post(format!(
            "http://example.com/customers/{customer}/cart/remove-unavailable"
        ))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
