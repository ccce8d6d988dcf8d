//! Cart validator.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::domain::{
    carts::{
        CartsService,
        errors::CartsServiceError,
        models::{Cart, CartItems},
    },
    catalog::{ProductGateway, models::ProductLookup},
    customers::records::CustomerUuid,
    tenants::records::TenantUuid,
    validation::{models::ValidationResult, rules::assess_item},
};

pub struct CartValidator {
    carts: Arc<dyn CartsService>,
    gateway: Arc<dyn ProductGateway>,
}

impl std::fmt::Debug for CartValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartValidator").finish_non_exhaustive()
    }
}

impl CartValidator {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsService>, gateway: Arc<dyn ProductGateway>) -> Self {
        Self { carts, gateway }
    }
}

#[async_trait]
impl CartValidation for CartValidator {
    async fn validate(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<ValidationResult, CartsServiceError> {
        let cart = self.carts.get_cart(tenant, customer).await?;

        Ok(self.validate_cart(cart).await)
    }

    async fn validate_cart(&self, cart: Cart) -> ValidationResult {
        let now = Timestamp::now();

        if cart.items.is_empty() {
            return ValidationResult::empty(cart.uuid, now, cart.expires_at);
        }

        let product_ids: Vec<String> = cart
            .items
            .iter()
            .map(|item| item.product_id.clone())
            .collect();

        let lookups = self.gateway.lookup(cart.tenant_uuid, &product_ids).await;

        let by_id: FxHashMap<&str, &ProductLookup> = lookups
            .iter()
            .map(|lookup| (lookup.id.as_str(), lookup))
            .collect();

        let validated = cart
            .items
            .iter()
            .map(|item| assess_item(item, by_id.get(item.product_id.as_str()).copied(), now))
            .collect();

        let result = ValidationResult::summarise(
            cart.uuid,
            cart.items.as_slice(),
            validated,
            now,
            cart.expires_at,
        );

        let items: CartItems = result
            .items
            .iter()
            .map(|validated| validated.item.clone())
            .collect();

        match self
            .carts
            .save_items(cart.tenant_uuid, cart.uuid, cart.version, items, Some(now))
            .await
        {
            Ok(_) => {
                debug!(
                    tenant = %cart.tenant_uuid,
                    cart = %cart.uuid,
                    items_updated = result.items_updated,
                    "stored validation result"
                );
            }
            Err(error) => {
                warn!(
                    tenant = %cart.tenant_uuid,
                    cart = %cart.uuid,
                    %error,
                    "failed to store validation result"
                );
            }
        }

        result
    }
}

#[automock]
#[async_trait]
pub trait CartValidation: Send + Sync {
    /// Validate a customer's cart against the catalog and store the outcome.
    async fn validate(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<ValidationResult, CartsServiceError>;

    /// Validate an already loaded cart. A failed write-back is logged, not
    /// returned.
    async fn validate_cart(&self, cart: Cart) -> ValidationResult;
}
