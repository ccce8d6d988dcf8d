//! Catalog event handlers.
//!
//! Events patch the carts they touch straight away. Restocks are left alone:
//! whether a line is purchasable again depends on price and quantity together,
//! which only a full validation pass checks.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, warn};

use crate::{
    domain::{
        carts::{
            CartsService, messages,
            models::{Cart, CartItemStatus, CartItems},
        },
        catalog::{ProductGateway, client::to_minor_units},
        tenants::records::TenantUuid,
    },
    events::{
        errors::EventError,
        models::{EventStream, InventoryEvent, InventoryEventKind, ProductEvent, ProductEventKind},
    },
};

pub struct CartEventHandler {
    carts: Arc<dyn CartsService>,
    gateway: Arc<dyn ProductGateway>,
}

impl CartEventHandler {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsService>, gateway: Arc<dyn ProductGateway>) -> Self {
        Self { carts, gateway }
    }

    /// Apply `edit` to every cart of `tenant` holding `product_id` and store
    /// the ones it changed. Returns how many carts were written.
    async fn patch_carts<F>(
        &self,
        tenant: TenantUuid,
        product_id: &str,
        edit: F,
    ) -> Result<usize, EventError>
    where
        F: Fn(&mut CartItems) -> usize + Send + Sync,
    {
        let records = self.carts.find_carts_with_product(tenant, product_id).await?;

        let mut patched = 0;

        for record in records {
            let cart_uuid = record.uuid;

            let cart = match Cart::try_from(record) {
                Ok(cart) => cart,
                Err(error) => {
                    warn!(
                        tenant = %tenant,
                        cart = %cart_uuid,
                        error = %error,
                        "skipping cart with unreadable items"
                    );

                    continue;
                }
            };

            let mut items = cart.items;

            if edit(&mut items) == 0 {
                continue;
            }

            self.carts
                .save_items(tenant, cart.uuid, cart.version, items, None)
                .await?;

            patched += 1;
        }

        Ok(patched)
    }

    async fn handle_product(&self, event: ProductEvent) -> Result<usize, EventError> {
        let tenant = event.tenant_uuid;
        let product_id = event.product_id.as_str();

        self.gateway.invalidate(tenant, product_id).await;

        match event.kind() {
            ProductEventKind::Deleted | ProductEventKind::Archived => {
                self.patch_carts(tenant, product_id, |items| {
                    items.mark_product(
                        product_id,
                        CartItemStatus::Unavailable,
                        Some(messages::PRODUCT_REMOVED),
                    )
                })
                .await
            }
            ProductEventKind::Updated => {
                let price = event
                    .price
                    .map(|price| to_minor_units(price).ok_or(EventError::InvalidPrice))
                    .transpose()?;

                let unpublished = event.unpublishes();

                if price.is_none() && !unpublished {
                    return Ok(0);
                }

                self.patch_carts(tenant, product_id, |items| {
                    let repriced = price.map_or(0, |price| items.reprice_product(product_id, price));

                    let marked = if unpublished {
                        items.mark_product(
                            product_id,
                            CartItemStatus::Unavailable,
                            Some(messages::NO_LONGER_AVAILABLE),
                        )
                    } else {
                        0
                    };

                    repriced + marked
                })
                .await
            }
            ProductEventKind::Other(event_type) => {
                debug!(tenant = %tenant, event_type, "ignoring product event");

                Ok(0)
            }
        }
    }

    async fn handle_inventory(&self, event: InventoryEvent) -> Result<usize, EventError> {
        let tenant = event.tenant_uuid;
        let kind = event.kind();

        if let InventoryEventKind::Other(event_type) = &kind {
            debug!(tenant = %tenant, event_type, "ignoring inventory event");

            return Ok(0);
        }

        let mut patched = 0;

        for level in &event.items {
            let product_id = level.product_id.as_str();

            self.gateway.invalidate(tenant, product_id).await;

            patched += match &kind {
                InventoryEventKind::OutOfStock => {
                    self.patch_carts(tenant, product_id, |items| {
                        items.mark_product(
                            product_id,
                            CartItemStatus::OutOfStock,
                            Some(messages::OUT_OF_STOCK),
                        )
                    })
                    .await?
                }
                InventoryEventKind::LowStock => {
                    self.patch_carts(tenant, product_id, |items| {
                        items.mark_low_stock(product_id, level.current_stock)
                    })
                    .await?
                }
                InventoryEventKind::Restocked | InventoryEventKind::Other(_) => {
                    debug!(
                        tenant = %tenant,
                        product = product_id,
                        "restock left for the next validation pass"
                    );

                    0
                }
            };
        }

        Ok(patched)
    }
}

#[async_trait]
impl EventHandler for CartEventHandler {
    async fn handle(&self, stream: EventStream, payload: &[u8]) -> Result<usize, EventError> {
        match stream {
            EventStream::Products => {
                self.handle_product(serde_json::from_slice(payload)?).await
            }
            EventStream::Inventory => {
                self.handle_inventory(serde_json::from_slice(payload)?).await
            }
        }
    }
}

#[automock]
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Apply one event payload. Returns how many carts were changed.
    async fn handle(&self, stream: EventStream, payload: &[u8]) -> Result<usize, EventError>;
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::json;
    use testresult::TestResult;

    use crate::domain::{
        carts::{
            CartsServiceError, MockCartsService,
            models::{CartItem, CartItemUuid, CartUuid},
            records::CartRecord,
        },
        catalog::MockProductGateway,
        customers::records::CustomerUuid,
    };

    use super::*;

    fn item(product_id: &str, price: u64, status: CartItemStatus) -> CartItem {
        CartItem {
            uuid: CartItemUuid::new(),
            product_id: product_id.to_string(),
            variant_id: None,
            name: "Mug".to_string(),
            sku: None,
            image: None,
            price,
            price_at_add: price,
            quantity: 2,
            status,
            status_message: None,
            available_stock: None,
            added_at: Timestamp::now(),
            last_validated_at: None,
        }
    }

    fn record(tenant: TenantUuid, items: Vec<CartItem>) -> TestResult<CartRecord> {
        let items = CartItems::new(items);
        let totals = items.totals();
        let now = Timestamp::now();

        Ok(CartRecord {
            uuid: CartUuid::new(),
            tenant_uuid: tenant,
            customer_uuid: CustomerUuid::new(),
            items: items.to_document()?,
            subtotal: totals.subtotal,
            item_count: totals.item_count,
            has_unavailable_items: totals.has_unavailable_items,
            has_price_changes: totals.has_price_changes,
            unavailable_count: totals.unavailable_count,
            version: 4,
            last_item_change: Some(now),
            last_validated_at: None,
            expires_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    fn gateway() -> MockProductGateway {
        let mut gateway = MockProductGateway::new();

        gateway.expect_invalidate().returning(|_, _| ());

        gateway
    }

    fn carts_holding(records: Vec<CartRecord>) -> MockCartsService {
        let mut carts = MockCartsService::new();

        carts
            .expect_find_carts_with_product()
            .once()
            .return_once(move |_, _| Ok(records));

        carts
    }

    fn handler(carts: MockCartsService) -> CartEventHandler {
        CartEventHandler::new(Arc::new(carts), Arc::new(gateway()))
    }

    fn payload(value: &serde_json::Value) -> TestResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    #[tokio::test]
    async fn deleted_product_marks_lines_unavailable() -> TestResult {
        let tenant = TenantUuid::new();
        let cart = record(tenant, vec![item("prod-1", 1_000, CartItemStatus::Available)])?;
        let cart_uuid = cart.uuid;
        let stored = Cart::try_from(cart.clone())?;

        let mut carts = carts_holding(vec![cart]);

        carts
            .expect_save_items()
            .once()
            .withf(move |t, c, version, items, validated_at| {
                let line = &items.as_slice()[0];

                *t == tenant
                    && *c == cart_uuid
                    && *version == 4
                    && validated_at.is_none()
                    && line.status == CartItemStatus::Unavailable
                    && line.status_message.as_deref() == Some(messages::PRODUCT_REMOVED)
            })
            .return_once(move |_, _, _, _, _| Ok(stored));

        let patched = handler(carts)
            .handle(
                EventStream::Products,
                &payload(&json!({
                    "eventType": "product.deleted",
                    "tenantId": tenant,
                    "productId": "prod-1",
                }))?,
            )
            .await?;

        assert_eq!(patched, 1);

        Ok(())
    }

    #[tokio::test]
    async fn price_update_reprices_matching_lines() -> TestResult {
        let tenant = TenantUuid::new();
        let cart = record(tenant, vec![item("prod-1", 1_000, CartItemStatus::Available)])?;

        let mut carts = carts_holding(vec![cart.clone()]);
        let stored = Cart::try_from(cart)?;

        carts
            .expect_save_items()
            .once()
            .withf(|_, _, _, items, _| {
                let line = &items.as_slice()[0];

                line.price == 1_250
                    && line.price_at_add == 1_000
                    && line.status == CartItemStatus::PriceChanged
            })
            .return_once(move |_, _, _, _, _| Ok(stored));

        let patched = handler(carts)
            .handle(
                EventStream::Products,
                &payload(&json!({
                    "eventType": "updated",
                    "tenantId": tenant,
                    "productId": "prod-1",
                    "price": 12.5,
                }))?,
            )
            .await?;

        assert_eq!(patched, 1);

        Ok(())
    }

    #[tokio::test]
    async fn update_without_price_or_status_touches_nothing() -> TestResult {
        let tenant = TenantUuid::new();

        let mut carts = MockCartsService::new();

        carts.expect_find_carts_with_product().never();
        carts.expect_save_items().never();

        let patched = handler(carts)
            .handle(
                EventStream::Products,
                &payload(&json!({
                    "eventType": "product.updated",
                    "tenantId": tenant,
                    "productId": "prod-1",
                    "name": "Renamed mug",
                }))?,
            )
            .await?;

        assert_eq!(patched, 0);

        Ok(())
    }

    #[tokio::test]
    async fn negative_price_is_rejected() -> TestResult {
        let tenant = TenantUuid::new();

        let result = handler(MockCartsService::new())
            .handle(
                EventStream::Products,
                &payload(&json!({
                    "eventType": "product.updated",
                    "tenantId": tenant,
                    "productId": "prod-1",
                    "price": -3,
                }))?,
            )
            .await;

        assert!(
            matches!(result, Err(EventError::InvalidPrice)),
            "expected invalid price, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn low_stock_records_available_count() -> TestResult {
        let tenant = TenantUuid::new();
        let cart = record(tenant, vec![item("prod-1", 1_000, CartItemStatus::Available)])?;

        let mut carts = carts_holding(vec![cart.clone()]);
        let stored = Cart::try_from(cart)?;

        carts
            .expect_save_items()
            .once()
            .withf(|_, _, _, items, _| {
                let line = &items.as_slice()[0];

                line.status == CartItemStatus::LowStock
                    && line.available_stock == Some(1)
                    && line.status_message.as_deref() == Some("Only 1 available")
            })
            .return_once(move |_, _, _, _, _| Ok(stored));

        let patched = handler(carts)
            .handle(
                EventStream::Inventory,
                &payload(&json!({
                    "eventType": "inventory.low_stock",
                    "tenantId": tenant,
                    "items": [{"productId": "prod-1", "currentStock": 1}],
                }))?,
            )
            .await?;

        assert_eq!(patched, 1);

        Ok(())
    }

    #[tokio::test]
    async fn restock_leaves_carts_untouched() -> TestResult {
        let tenant = TenantUuid::new();

        let mut carts = MockCartsService::new();

        carts.expect_find_carts_with_product().never();
        carts.expect_save_items().never();

        let patched = handler(carts)
            .handle(
                EventStream::Inventory,
                &payload(&json!({
                    "eventType": "inventory.restocked",
                    "tenantId": tenant,
                    "items": [{"productId": "prod-1", "currentStock": 40}],
                }))?,
            )
            .await?;

        assert_eq!(patched, 0);

        Ok(())
    }

    #[tokio::test]
    async fn unchanged_carts_are_not_written() -> TestResult {
        let tenant = TenantUuid::new();
        let mut marked = item("prod-1", 1_000, CartItemStatus::OutOfStock);
        marked.status_message = Some(messages::OUT_OF_STOCK.to_string());

        let mut carts = carts_holding(vec![record(tenant, vec![marked])?]);

        carts.expect_save_items().never();

        let patched = handler(carts)
            .handle(
                EventStream::Inventory,
                &payload(&json!({
                    "eventType": "out_of_stock",
                    "tenantId": tenant,
                    "items": [{"productId": "prod-1", "currentStock": 0}],
                }))?,
            )
            .await?;

        assert_eq!(patched, 0);

        Ok(())
    }

    #[tokio::test]
    async fn conflicting_write_is_returned_for_redelivery() -> TestResult {
        let tenant = TenantUuid::new();
        let cart = record(tenant, vec![item("prod-1", 1_000, CartItemStatus::Available)])?;

        let mut carts = carts_holding(vec![cart]);

        carts
            .expect_save_items()
            .returning(|_, _, _, _, _| Err(CartsServiceError::Conflict));

        let result = handler(carts)
            .handle(
                EventStream::Inventory,
                &payload(&json!({
                    "eventType": "out_of_stock",
                    "tenantId": tenant,
                    "items": [{"productId": "prod-1", "currentStock": 0}],
                }))?,
            )
            .await;

        assert!(
            matches!(&result, Err(error @ EventError::Carts(CartsServiceError::Conflict)) if error.is_retryable()),
            "expected retryable conflict, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn undecodable_payload_is_not_retryable() {
        let result = handler(MockCartsService::new())
            .handle(EventStream::Products, b"not json")
            .await;

        assert!(
            matches!(&result, Err(error) if !error.is_retryable()),
            "expected permanent decode error, got {result:?}"
        );
    }
}
