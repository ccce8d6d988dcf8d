//! Add Cart Item Handler

use std::sync::Arc;

use salvo::{
    http::header::LOCATION,
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, requests::CartItemRequest, responses::CartResponse},
    extensions::*,
    state::State,
};

/// Add Cart Item Handler
///
/// Adds a line to the customer's cart, creating the cart on first add. A line
/// for the same product and variant has its quantity increased instead.
#[endpoint(
    tags("carts"),
    summary = "Add Item to Cart",
    responses(
        (status_code = StatusCode::CREATED, description = "Cart item added"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::CONFLICT, description = "Cart was modified concurrently"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    json: JsonBody<CartItemRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;

    let customer = customer.into_inner();
    let request = json.into_inner();
    let product_id = request.product_id.clone();
    let variant_id = request.variant_id.clone();

    let cart = state
        .app
        .carts
        .add_item(tenant, customer.into(), request.into())
        .await
        .map_err(into_status_error)?;

    if let Some(item) = cart.items.find(&product_id, variant_id.as_deref()) {
        res.add_header(
            LOCATION,
            format!("/customers/{customer}/cart/items/{}", item.uuid),
            true,
        )
        .or_500("failed to set location header")?;
    }

    res.status_code(StatusCode::CREATED);

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
        Router::with_path("customers/{customer}/cart/items").post(handler)
    }

    #[tokio::test]
    async fn test_add_item_returns_201_with_location() -> TestResult {
        let customer = CustomerUuid::new();
        let cart = make_cart(customer, vec![make_item("sku-1", 1_999, 2)]);
        let item = cart.items.iter().next().map(|item| item.uuid).ok_or("no item")?;

        let mut carts = MockCartsService::new();

        carts
            .expect_add_item()
            .once()
            .withf(move |tenant, c, new| {
                *tenant == TEST_TENANT_UUID
                    && *c == customer
                    && new.product_id == "sku-1"
                    && new.price == 1_999
                    && new.quantity == 2
            })
            .return_once(move |_, _, _| Ok(cart));

        let mut res = TestClient::post(format!(
            "http://example.com/customers/{customer}/cart/items"
        ))
        .json(&json!({
            "product_id": "sku-1",
            "name": "Product sku-1",
            "price": 1999,
            "quantity": 2
        }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));

        let expected_location = format!("/customers/{customer}/cart/items/{item}");

        assert_eq!(
            res.headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some(expected_location.as_str())
        );

        let body: CartResponse = res.take_json().await?;

        assert_eq!(body.item_count, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_zero_quantity_returns_400() -> TestResult {
        let customer = CustomerUuid::new();

        let mut carts = MockCartsService::new();

        carts
            .expect_add_item()
            .once()
            .return_once(|_, _, _| Err(CartsServiceError::InvalidQuantity));

        let res = TestClient::post(format!(
            "http://example.com/customers/{customer}/cart/items"
        ))
        .json(&json!({
            "product_id": "sku-1",
            "name": "Product sku-1",
            "price": 1999,
            "quantity": 0
        }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_negative_price_returns_400() -> TestResult {
        let customer = CustomerUuid::new();

        let mut carts = MockCartsService::new();

        carts.expect_add_item().never();

        let res = TestClient::post(format!(
            "http://example.com/customers/{customer}/cart/items"
        ))
        .json(&json!({
            "product_id": "sku-1",
            "name": "Product sku-1",
            "price": -5,
            "quantity": 1
        }))
        .send(&Mocks::with_carts(carts).service(route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
