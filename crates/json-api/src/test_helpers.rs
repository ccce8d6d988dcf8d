//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;

use cartkeeper_app::{
    context::AppContext,
    domain::{
        abandoned_carts::{
            MockAbandonedCartsService,
            models::{AbandonedCart, AbandonedCartStatus, AbandonedCartUuid},
        },
        carts::{
            MockCartsService,
            models::{Cart, CartItem, CartItemStatus, CartItemUuid, CartItems, CartUuid},
        },
        catalog::MockProductGateway,
        customers::{MockCustomersService, records::CustomerUuid},
        tenants::{MockTenantsService, records::TenantUuid},
        validation::MockCartValidation,
    },
    events::{dead_letters::MockDeadLetterStore, handlers::MockEventHandler},
};
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use crate::{extensions::*, state::State};

pub(crate) const TEST_TENANT_UUID: TenantUuid = TenantUuid::from_uuid(Uuid::nil());

#[salvo::handler]
pub(crate) async fn inject_tenant(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_tenant_uuid(TEST_TENANT_UUID);
    ctrl.call_next(req, depot, res).await;
}

/// Services a handler test does not exercise. Mocks without expectations
/// fail the test on any call.
#[derive(Default)]
pub(crate) struct Mocks {
    pub carts: MockCartsService,
    pub validator: MockCartValidation,
    pub abandoned_carts: MockAbandonedCartsService,
}

impl Mocks {
    pub(crate) fn with_carts(carts: MockCartsService) -> Self {
        Self {
            carts,
            ..Self::default()
        }
    }

    pub(crate) fn with_abandoned_carts(abandoned_carts: MockAbandonedCartsService) -> Self {
        Self {
            abandoned_carts,
            ..Self::default()
        }
    }

    pub(crate) fn into_state(self) -> Arc<State> {
        let app = AppContext {
            carts: Arc::new(self.carts),
            customers: Arc::new(MockCustomersService::new()),
            tenants: Arc::new(MockTenantsService::new()),
            products: Arc::new(MockProductGateway::new()),
            validator: Arc::new(self.validator),
            abandoned_carts: Arc::new(self.abandoned_carts),
            events: Arc::new(MockEventHandler::new()),
            dead_letters: Arc::new(MockDeadLetterStore::new()),
        };

        Arc::new(State::new(app, None))
    }

    /// Serve `route` with these mocks and the test tenant injected.
    pub(crate) fn service(self, route: Router) -> Service {
        Service::new(
            Router::new()
                .hoop(inject(self.into_state()))
                .hoop(inject_tenant)
                .push(route),
        )
    }
}

pub(crate) fn make_item(product_id: &str, price: u64, quantity: u32) -> CartItem {
    CartItem {
        uuid: CartItemUuid::new(),
        product_id: product_id.to_string(),
        variant_id: None,
        name: format!("Product {product_id}"),
        sku: None,
        image: None,
        price,
        price_at_add: price,
        quantity,
        status: CartItemStatus::Available,
        status_message: None,
        available_stock: None,
        added_at: Timestamp::now(),
        last_validated_at: None,
    }
}

pub(crate) fn make_cart(customer: CustomerUuid, items: Vec<CartItem>) -> Cart {
    let now = Timestamp::now();
    let items = CartItems::new(items);
    let totals = items.totals();

    Cart {
        uuid: CartUuid::new(),
        tenant_uuid: TEST_TENANT_UUID,
        customer_uuid: customer,
        items,
        subtotal: totals.subtotal,
        item_count: totals.item_count,
        has_unavailable_items: totals.has_unavailable_items,
        has_price_changes: totals.has_price_changes,
        unavailable_count: totals.unavailable_count,
        version: 1,
        last_item_change: Some(now),
        last_validated_at: None,
        expires_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn make_abandoned_cart(status: AbandonedCartStatus) -> AbandonedCart {
    let now = Timestamp::now();
    let items = CartItems::new(vec![make_item("sku-1", 2_500, 2)]);
    let totals = items.totals();

    AbandonedCart {
        uuid: AbandonedCartUuid::new(),
        tenant_uuid: TEST_TENANT_UUID,
        cart_uuid: CartUuid::new(),
        customer_uuid: CustomerUuid::new(),
        status,
        items,
        subtotal: totals.subtotal,
        item_count: totals.item_count,
        customer_email: "shopper@example.com".to_string(),
        customer_first_name: Some("Sam".to_string()),
        customer_last_name: None,
        abandoned_at: now,
        last_cart_activity: now,
        reminder_count: 0,
        last_reminder_at: None,
        next_reminder_at: Some(now),
        recovered_at: None,
        recovered_order_id: None,
        recovery_source: None,
        discount_used: None,
        recovered_value: None,
        expired_at: None,
        created_at: now,
        updated_at: now,
    }
}
