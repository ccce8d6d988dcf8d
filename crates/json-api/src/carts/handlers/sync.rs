//! Sync Cart Handler

use std::sync::Arc;

use salvo::{
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, requests::SyncCartRequest, responses::CartResponse},
    extensions::*,
    state::State,
};

/// Sync Cart Handler
///
/// Replaces the cart's lines with the storefront's copy. Lines already in the
/// cart keep their price at add and status.
#[endpoint(
    tags("carts"),
    summary = "Sync Cart",
    responses(
        (status_code = StatusCode::OK, description = "Cart synced"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::CONFLICT, description = "Cart was modified concurrently"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "carts.sync",
    skip(customer, json, depot),
    fields(
        tenant_uuid = tracing::field::Empty,
        customer_uuid = tracing::field::Empty,
        items = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    json: JsonBody<SyncCartRequest>,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let customer = customer.into_inner();
    let items = json.into_inner().items;

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(tenant));
    span.record("customer_uuid", tracing::field::display(customer));
    span.record("items", items.len());

    let cart = state
        .app
        .carts
        .sync_cart(
            tenant,
            customer.into(),
            items.into_iter().map(Into::into).collect(),
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(cart.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use cartkeeper_app::domain::{
        carts::{CartsServiceError, MockCartsService},
        customers::records::CustomerUuid,
    };

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID, make_cart, make_item};

    use super::*;

    fn route() -> Router {
        Router::with_path("customers/{customer}/cart").put(handler)
    }

    #[tokio::test]
    async fn test_sync_replaces_items() -> TestResult {
        let customer = CustomerUuid::new();
        let cart = make_cart(
            customer,
            vec![make_item("sku-1", 500, 1), make_item("sku-2", 750, 2)],
        );

        let mut carts = MockCartsService::new();

        carts
            .expect_sync_cart()
            .once()
            .withf(move |tenant, c, items| {
                *tenant == TEST_TENANT_UUID
                    && *c == customer
                    && items.len() == 2
                    && items.iter().any(|item| item.product_id == "sku-2" && item.quantity == 2)
            })
            .return_once(move |_, _, _| Ok(cart));

        let mut res = TestClient::put(format!("http://example.com/customers/{customer}/cart"))
            .json(&json!({
                "items": [
                    { "product_id": "sku-1", "name": "One", "price": 500, "quantity": 1 },
                    { "product_id": "sku-2", "name": "Two", "price": 750, "quantity": 2 }
                ]
            }))
            .send(&Mocks::with_carts(carts).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: CartResponse = res.take_json().await?;

        assert_eq!(body.items.len(), 2);
        assert_eq!(body.subtotal, 2_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_conflict_returns_409() -> TestResult {
        let customer = CustomerUuid::new();

        let mut carts = MockCartsService::new();

        carts
            .expect_sync_cart()
            .once()
            .return_once(|_, _, _| Err(CartsServiceError::Conflict));

        let res = TestClient::put(format!("http://example.com/customers/{customer}/cart"))
            .json(&json!({ "items": [] }))
            .send(&Mocks::with_carts(carts).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_malformed_body_returns_400() -> TestResult {
        let customer = CustomerUuid::new();

        let mut carts = MockCartsService::new();

        carts.expect_sync_cart().never();

        let res = TestClient::put(format!("http://example.com/customers/{customer}/cart"))
            .json(&json!({ "items": [{ "product_id": "sku-1" }] }))
            .send(&Mocks::with_carts(carts).service(route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
