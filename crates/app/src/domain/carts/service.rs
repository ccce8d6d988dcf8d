//! Carts service.

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use tracing::debug;

use crate::{
    database::Db,
    domain::{
        carts::{
            data::{CartWrite, NewCartItem},
            errors::CartsServiceError,
            models::{
                CART_LIFETIME_DAYS, Cart, CartChange, CartItemStatus, CartItemUuid, CartItems,
                CartRef, CartUuid,
            },
            records::CartRecord,
            repositories::PgCartsRepository,
        },
        customers::records::CustomerUuid,
        tenants::records::TenantUuid,
    },
};

/// Customer edits retry this many times when a background writer wins the
/// race for the same cart.
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhenMissing {
    Create,
    Fail,
}

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    repository: PgCartsRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCartsRepository::new(),
        }
    }

    /// Load, edit and store a customer's cart under compare-and-swap.
    ///
    /// `edit` may run more than once and returns how many lines it touched.
    async fn edit_cart<F>(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        when_missing: WhenMissing,
        edit: F,
    ) -> Result<CartChange, CartsServiceError>
    where
        F: Fn(&mut CartItems, Timestamp) -> Result<usize, CartsServiceError> + Send + Sync,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let now = Timestamp::now();
            let mut tx = self.db.begin().await?;

            let current = match self.repository.find_cart(&mut tx, tenant, customer).await? {
                Some(record) => Some(Cart::try_from(record)?),
                None if when_missing == WhenMissing::Create => None,
                None => return Err(CartsServiceError::NotFound),
            };

            let mut items = current
                .as_ref()
                .map(|cart| cart.items.clone())
                .unwrap_or_default();

            let affected = edit(&mut items, now)?;

            let stored = match current {
                None => {
                    let write = CartWrite::from_items(&items)?.touched(now, expiry_from(now));

                    self.repository
                        .insert_cart(&mut tx, tenant, customer, &write)
                        .await?
                }
                Some(cart) if cart.items == items => {
                    tx.commit().await?;

                    return Ok(CartChange { cart, affected });
                }
                Some(cart) => {
                    let mut write = CartWrite::from_items(&items)?;

                    if !cart.items.same_content(&items) {
                        write = write.touched(now, expiry_from(now));
                    }

                    self.repository
                        .update_cart(&mut tx, tenant, cart.uuid, cart.version, &write)
                        .await?
                }
            };

            let Some(record) = stored else {
                debug!(%tenant, %customer, attempt, "cart write lost a race, retrying");

                continue;
            };

            tx.commit().await?;

            return Ok(CartChange {
                cart: Cart::try_from(record)?,
                affected,
            });
        }

        Err(CartsServiceError::Conflict)
    }
}

fn expiry_from(now: Timestamp) -> Timestamp {
    now + SignedDuration::from_hours(CART_LIFETIME_DAYS * 24)
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .find_cart(&mut tx, tenant, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(Cart::try_from(record)?)
    }

    async fn add_item(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: NewCartItem,
    ) -> Result<Cart, CartsServiceError> {
        if item.quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let change = self
            .edit_cart(tenant, customer, WhenMissing::Create, |items, now| {
                match items.find_mut(&item.product_id, item.variant_id.as_deref()) {
                    Some(existing) => {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                    None => items.push(item.clone().into_item(now)),
                }

                Ok(1)
            })
            .await?;

        Ok(change.cart)
    }

    async fn update_item_quantity(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: CartItemUuid,
        quantity: i64,
    ) -> Result<Cart, CartsServiceError> {
        let change = self
            .edit_cart(tenant, customer, WhenMissing::Fail, |items, _now| {
                if quantity <= 0 {
                    return if items.remove(item) {
                        Ok(1)
                    } else {
                        Err(CartsServiceError::ItemNotFound)
                    };
                }

                let Ok(quantity) = u32::try_from(quantity) else {
                    return Err(CartsServiceError::InvalidQuantity);
                };

                let existing = items.get_mut(item).ok_or(CartsServiceError::ItemNotFound)?;

                existing.quantity = quantity;

                Ok(1)
            })
            .await?;

        Ok(change.cart)
    }

    async fn remove_item(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError> {
        let change = self
            .edit_cart(tenant, customer, WhenMissing::Fail, |items, _now| {
                if items.remove(item) {
                    Ok(1)
                } else {
                    Err(CartsServiceError::ItemNotFound)
                }
            })
            .await?;

        Ok(change.cart)
    }

    async fn sync_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        incoming: Vec<NewCartItem>,
    ) -> Result<Cart, CartsServiceError> {
        if incoming.iter().any(|item| item.quantity == 0) {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let change = self
            .edit_cart(tenant, customer, WhenMissing::Create, |items, now| {
                let mut synced = CartItems::default();

                for new in &incoming {
                    if let Some(line) =
                        synced.find_mut(&new.product_id, new.variant_id.as_deref())
                    {
                        line.quantity = line.quantity.saturating_add(new.quantity);

                        continue;
                    }

                    let line = match items.find(&new.product_id, new.variant_id.as_deref()) {
                        Some(existing) => {
                            let mut kept = existing.clone();

                            kept.name.clone_from(&new.name);
                            kept.sku.clone_from(&new.sku);
                            kept.image.clone_from(&new.image);
                            kept.price = new.price;
                            kept.quantity = new.quantity;
                            kept
                        }
                        None => new.clone().into_item(now),
                    };

                    synced.push(line);
                }

                let affected = synced.len();

                *items = synced;

                Ok(affected)
            })
            .await?;

        Ok(change.cart)
    }

    async fn clear_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .delete_cart(&mut tx, tenant, customer)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn remove_unavailable_items(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CartChange, CartsServiceError> {
        self.edit_cart(tenant, customer, WhenMissing::Fail, |items, _now| {
            Ok(items.retain(|item| item.status.is_purchasable()))
        })
        .await
    }

    async fn accept_price_changes(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CartChange, CartsServiceError> {
        self.edit_cart(tenant, customer, WhenMissing::Fail, |items, _now| {
            let mut accepted = 0;

            for item in items
                .iter_mut()
                .filter(|item| item.status == CartItemStatus::PriceChanged)
            {
                item.price_at_add = item.price;
                item.status = CartItemStatus::Available;
                item.status_message = None;
                accepted += 1;
            }

            Ok(accepted)
        })
        .await
    }

    async fn save_items(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        expected_version: i64,
        items: CartItems,
        validated_at: Option<Timestamp>,
    ) -> Result<Cart, CartsServiceError> {
        let write = CartWrite::from_items(&items)?.validated(validated_at);

        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .update_cart(&mut tx, tenant, cart, expected_version, &write)
            .await?
            .ok_or(CartsServiceError::Conflict)?;

        tx.commit().await?;

        Ok(Cart::try_from(record)?)
    }

    async fn list_stale_carts(
        &self,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRef>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let carts = self
            .repository
            .list_stale_carts(&mut tx, stale_before, limit)
            .await?;

        tx.commit().await?;

        Ok(carts)
    }

    async fn delete_expired_carts(&self, now: Timestamp) -> Result<u64, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let deleted = self.repository.delete_expired_carts(&mut tx, now).await?;

        tx.commit().await?;

        Ok(deleted)
    }

    async fn list_carts_with_items(
        &self,
        after: Option<CartUuid>,
        limit: u32,
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .list_carts_with_items(&mut tx, after, limit)
            .await?;

        tx.commit().await?;

        Ok(records)
    }

    async fn find_carts_with_product(
        &self,
        tenant: TenantUuid,
        product_id: &str,
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .find_carts_with_product(&mut tx, tenant, product_id)
            .await?;

        tx.commit().await?;

        Ok(records)
    }

    async fn list_inactive_carts(
        &self,
        tenant: TenantUuid,
        inactive_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .list_inactive_carts(&mut tx, tenant, inactive_before, limit)
            .await?;

        tx.commit().await?;

        Ok(records)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve a customer's cart.
    async fn get_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Add an item, merging with an existing line for the same product and
    /// variant. Creates the cart on first add.
    async fn add_item(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: NewCartItem,
    ) -> Result<Cart, CartsServiceError>;

    /// Set a line's quantity. Zero or less removes the line.
    async fn update_item_quantity(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: CartItemUuid,
        quantity: i64,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove a single line.
    async fn remove_item(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Replace the item list with a storefront's copy, keeping the snapshot
    /// fields of lines that were already present.
    async fn sync_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
        items: Vec<NewCartItem>,
    ) -> Result<Cart, CartsServiceError>;

    /// Delete the cart.
    async fn clear_cart(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<(), CartsServiceError>;

    /// Drop every line that can no longer be purchased.
    async fn remove_unavailable_items(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CartChange, CartsServiceError>;

    /// Accept current prices for every repriced line.
    async fn accept_price_changes(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CartChange, CartsServiceError>;

    /// Store a recomputed item list if the cart is still at
    /// `expected_version`. Does not count as customer activity.
    async fn save_items(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        expected_version: i64,
        items: CartItems,
        validated_at: Option<Timestamp>,
    ) -> Result<Cart, CartsServiceError>;

    /// Non-empty carts never validated or last validated before
    /// `stale_before`, oldest first.
    async fn list_stale_carts(
        &self,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRef>, CartsServiceError>;

    /// Delete every cart whose expiration has passed.
    async fn delete_expired_carts(&self, now: Timestamp) -> Result<u64, CartsServiceError>;

    /// Page through non-empty carts across all tenants in id order.
    async fn list_carts_with_items(
        &self,
        after: Option<CartUuid>,
        limit: u32,
    ) -> Result<Vec<CartRecord>, CartsServiceError>;

    /// Carts of one tenant holding at least one line for `product_id`.
    async fn find_carts_with_product(
        &self,
        tenant: TenantUuid,
        product_id: &str,
    ) -> Result<Vec<CartRecord>, CartsServiceError>;

    /// Non-empty carts of one tenant with no item change since
    /// `inactive_before` and no open abandoned cart, oldest first.
    async fn list_inactive_carts(
        &self,
        tenant: TenantUuid,
        inactive_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRecord>, CartsServiceError>;
}
