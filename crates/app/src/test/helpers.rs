//! Test Helpers

use jiff::Timestamp;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    carts::{
        CartsService, CartsServiceError,
        data::NewCartItem,
        models::{Cart, CartItems},
    },
    customers::records::CustomerUuid,
    tenants::records::TenantUuid,
};

/// Insert a customer row directly; customers are owned by another service.
pub(crate) async fn insert_customer(
    pool: &PgPool,
    tenant: TenantUuid,
    email: &str,
    first_name: Option<&str>,
) -> CustomerUuid {
    let uuid = Uuid::now_v7();

    sqlx::query(
        "INSERT INTO customers (uuid, tenant_uuid, email, first_name) VALUES ($1, $2, $3, $4)",
    )
    .bind(uuid)
    .bind(tenant.into_uuid())
    .bind(email)
    .bind(first_name)
    .execute(pool)
    .await
    .expect("Failed to insert test customer");

    CustomerUuid::from_uuid(uuid)
}

/// Store a cart for `customer` holding one line per product, then backdate
/// every line's `added_at` to `added_at`.
pub(crate) async fn test_cart(
    carts: &dyn CartsService,
    tenant: TenantUuid,
    customer: CustomerUuid,
    products: &[&str],
    added_at: Timestamp,
) -> Result<Cart, CartsServiceError> {
    let mut cart = None;

    for product in products {
        cart = Some(
            carts
                .add_item(tenant, customer, NewCartItem::test_item(product, 1_000, 1))
                .await?,
        );
    }

    let cart = cart.ok_or(CartsServiceError::NotFound)?;

    let items: CartItems = cart
        .items
        .iter()
        .cloned()
        .map(|mut item| {
            item.added_at = added_at;
            item
        })
        .collect();

    carts
        .save_items(tenant, cart.uuid, cart.version, items, None)
        .await
}
