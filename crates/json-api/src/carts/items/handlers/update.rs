//! Update Cart Item Handler

use std::sync::Arc;

use salvo::{
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, requests::UpdateQuantityRequest, responses::CartResponse},
    extensions::*,
    state::State,
};

/// Update Cart Item Handler
///
/// Sets a line's quantity. A quantity of zero or less removes the line.
#[endpoint(
    tags("carts"),
    summary = "Update Cart Item Quantity",
    responses(
        (status_code = StatusCode::OK, description = "Cart item updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart or item not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::CONFLICT, description = "Cart was modified concurrently"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    item: PathParam<Uuid>,
    json: JsonBody<UpdateQuantityRequest>,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let cart = state
        .app
        .carts
        .update_item_quantity(
            tenant,
            customer.into_inner().into(),
            item.into_inner().into(),
            json.into_inner().quantity,
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
        Router::with_path("customers/{customer}/cart/items/{item}").put(handler)
    }

    #[tokio::test]
    async fn test_update_quantity_success() -> TestResult {
        let customer = CustomerUuid::new();
        let cart = make_cart(customer, vec![make_item("sku-1", 300, 5)]);
        let item = cart.items.iter().next().map(|item| item.uuid).ok_or("no item")?;

        let mut carts = MockCartsService::new();

        carts
            .expect_update_item_quantity()
            .once()
            .withf(move |tenant, c, i, quantity| {
                *tenant == TEST_TENANT_UUID && *c == customer && *i == item && *quantity == 5
            })
            .return_once(move |_, _, _, _| Ok(cart));

        let mut res = TestClient::put(format!(
            "http://example.com/customers/{customer}/cart/items/{item}"
        ))
        .json(&json!({ "quantity": 5 }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: CartResponse = res.take_json().await?;

        assert_eq!(body.subtotal, 1_500);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_quantity_passes_removal_through() -> TestResult {
        let customer = CustomerUuid::new();
        let cart = make_cart(customer, Vec::new());
        let item = Uuid::now_v7();

        let mut carts = MockCartsService::new();

        carts
            .expect_update_item_quantity()
            .once()
            .withf(|_, _, _, quantity| *quantity == -1)
            .return_once(move |_, _, _, _| Ok(cart));

        let mut res = TestClient::put(format!(
            "http://example.com/customers/{customer}/cart/items/{item}"
        ))
        .json(&json!({ "quantity": -1 }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: CartResponse = res.take_json().await?;

        assert!(body.items.is_empty(), "line should be gone");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_item_returns_404() -> TestResult {
        let customer = CustomerUuid::new();
        let item = Uuid::now_v7();

        let mut carts = MockCartsService::new();

        carts
            .expect_update_item_quantity()
            .once()
            .return_once(|_, _, _, _| Err(CartsServiceError::ItemNotFound));

        let res = TestClient::put(format!(
            "http://example.com/customers/{customer}/cart/items/{item}"
        ))
        .json(&json!({ "quantity": 2 }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
