//! Cart Models

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        carts::messages, customers::records::CustomerUuid, tenants::records::TenantUuid,
    },
    uuids::TypedUuid,
};

/// Schema version written into every stored item document.
pub const ITEMS_DOCUMENT_VERSION: u32 = 1;

/// Carts expire this many days after their last item change.
pub const CART_LIFETIME_DAYS: i64 = 90;

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItem>;

/// Availability of a single cart line, as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartItemStatus {
    #[default]
    Available,
    Unavailable,
    OutOfStock,
    LowStock,
    PriceChanged,
}

impl CartItemStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Unavailable => "UNAVAILABLE",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::LowStock => "LOW_STOCK",
            Self::PriceChanged => "PRICE_CHANGED",
        }
    }

    /// Items in these states can still be checked out.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Available | Self::LowStock | Self::PriceChanged)
    }

    /// Items in these states count toward the cart's unavailable total.
    #[must_use]
    pub const fn is_unavailable(self) -> bool {
        matches!(self, Self::Unavailable | Self::OutOfStock)
    }
}

impl Display for CartItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A single line in a cart. Embedded in the cart's item document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "id")]
    pub uuid: CartItemUuid,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: u64,
    #[serde(default)]
    pub price_at_add: u64,
    pub quantity: u32,
    #[serde(default)]
    pub status: CartItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_stock: Option<i64>,
    pub added_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated_at: Option<Timestamp>,
}

impl CartItem {
    /// Price the customer saw when adding the item. Older rows may carry a
    /// zero snapshot, in which case the current price is the baseline.
    #[must_use]
    pub fn baseline_price(&self) -> u64 {
        if self.price_at_add == 0 {
            self.price
        } else {
            self.price_at_add
        }
    }

    #[must_use]
    pub fn line_total(&self) -> u64 {
        self.price.saturating_mul(u64::from(self.quantity))
    }

    #[must_use]
    pub fn baseline_line_total(&self) -> u64 {
        self.baseline_price()
            .saturating_mul(u64::from(self.quantity))
    }

    #[must_use]
    pub fn matches(&self, product_id: &str, variant_id: Option<&str>) -> bool {
        self.product_id == product_id && self.variant_id.as_deref() == variant_id
    }

    /// Lookup key used by validation results: `product` or `product:variant`.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.variant_id {
            Some(variant) => format!("{}:{variant}", self.product_id),
            None => self.product_id.clone(),
        }
    }

    fn set_status(&mut self, status: CartItemStatus, message: Option<String>) -> bool {
        if self.status == status && self.status_message == message {
            return false;
        }

        self.status = status;
        self.status_message = message;

        true
    }
}

/// Aggregates derived from a cart's items. Always recomputed from the items,
/// never patched independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: u64,
    pub item_count: u64,
    pub has_unavailable_items: bool,
    pub has_price_changes: bool,
    pub unavailable_count: u32,
}

/// Errors decoding a stored item document.
#[derive(Debug, Error)]
pub enum ItemsDocumentError {
    #[error("unsupported item document version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed item document: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ItemsDocument {
    version: u32,
    items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
struct ItemsDocumentRef<'a> {
    version: u32,
    items: &'a [CartItem],
}

/// The ordered item list of a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItems(Vec<CartItem>);

impl CartItems {
    #[must_use]
    pub fn new(items: Vec<CartItem>) -> Self {
        Self(items)
    }

    /// Decode a stored `{"version": n, "items": [...]}` document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document does not parse or carries an
    /// unknown version.
    pub fn from_document(document: serde_json::Value) -> Result<Self, ItemsDocumentError> {
        let document: ItemsDocument = serde_json::from_value(document)?;

        if document.version != ITEMS_DOCUMENT_VERSION {
            return Err(ItemsDocumentError::UnsupportedVersion(document.version));
        }

        Ok(Self(document.items))
    }

    /// Encode as a versioned document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_document(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(ItemsDocumentRef {
            version: ITEMS_DOCUMENT_VERSION,
            items: &self.0,
        })
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.0.iter().fold(CartTotals::default(), |mut totals, item| {
            totals.subtotal = totals.subtotal.saturating_add(item.line_total());
            totals.item_count = totals.item_count.saturating_add(u64::from(item.quantity));

            if item.status.is_unavailable() {
                totals.has_unavailable_items = true;
                totals.unavailable_count = totals.unavailable_count.saturating_add(1);
            }

            if item.status == CartItemStatus::PriceChanged {
                totals.has_price_changes = true;
            }

            totals
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CartItem> {
        self.0.iter_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CartItem] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<CartItem> {
        self.0
    }

    pub fn push(&mut self, item: CartItem) {
        self.0.push(item);
    }

    #[must_use]
    pub fn find(&self, product_id: &str, variant_id: Option<&str>) -> Option<&CartItem> {
        self.0.iter().find(|item| item.matches(product_id, variant_id))
    }

    pub fn find_mut(&mut self, product_id: &str, variant_id: Option<&str>) -> Option<&mut CartItem> {
        self.0
            .iter_mut()
            .find(|item| item.matches(product_id, variant_id))
    }

    pub fn get_mut(&mut self, uuid: CartItemUuid) -> Option<&mut CartItem> {
        self.0.iter_mut().find(|item| item.uuid == uuid)
    }

    /// Remove the item with the given id, returning whether it was present.
    pub fn remove(&mut self, uuid: CartItemUuid) -> bool {
        self.retain(|item| item.uuid != uuid) > 0
    }

    /// Keep items matching the predicate, returning how many were dropped.
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&CartItem) -> bool,
    {
        let before = self.0.len();

        self.0.retain(keep);

        before - self.0.len()
    }

    /// Drop items added before `cutoff`.
    pub fn prune_added_before(&mut self, cutoff: Timestamp) -> usize {
        self.retain(|item| item.added_at >= cutoff)
    }

    /// Whether both lists hold the same lines in the same quantities.
    /// Prices and statuses are ignored.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(left, right)| {
                left.product_id == right.product_id
                    && left.variant_id == right.variant_id
                    && left.quantity == right.quantity
            })
    }

    /// Set the status of every line for `product_id`. Returns how many changed.
    pub fn mark_product(
        &mut self,
        product_id: &str,
        status: CartItemStatus,
        message: Option<&str>,
    ) -> usize {
        self.0
            .iter_mut()
            .filter(|item| item.product_id == product_id)
            .map(|item| item.set_status(status, message.map(ToString::to_string)))
            .filter(|changed| *changed)
            .count()
    }

    /// Record a low stock level on every line for `product_id`.
    pub fn mark_low_stock(&mut self, product_id: &str, available: i64) -> usize {
        let message = messages::low_stock(available);

        self.0
            .iter_mut()
            .filter(|item| item.product_id == product_id)
            .map(|item| {
                let stock_changed = item.available_stock != Some(available);

                item.available_stock = Some(available);

                item.set_status(CartItemStatus::LowStock, Some(message.clone())) || stock_changed
            })
            .filter(|changed| *changed)
            .count()
    }

    /// Apply a new catalog price to every line for `product_id`, flagging drift
    /// from the price at add. Unavailable lines keep their status.
    pub fn reprice_product(&mut self, product_id: &str, price: u64) -> usize {
        self.0
            .iter_mut()
            .filter(|item| item.product_id == product_id)
            .map(|item| {
                let price_changed = item.price != price;
                let baseline = item.baseline_price();

                item.price = price;

                let status_changed = if item.status.is_unavailable() {
                    false
                } else if price == baseline {
                    item.status == CartItemStatus::PriceChanged
                        && item.set_status(CartItemStatus::Available, None)
                } else {
                    item.set_status(
                        CartItemStatus::PriceChanged,
                        Some(messages::price_change(baseline, price)),
                    )
                };

                price_changed || status_changed
            })
            .filter(|changed| *changed)
            .count()
    }
}

impl FromIterator<CartItem> for CartItems {
    fn from_iter<I: IntoIterator<Item = CartItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CartItems {
    type Item = CartItem;
    type IntoIter = std::vec::IntoIter<CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Cart Model
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub uuid: CartUuid,
    pub tenant_uuid: TenantUuid,
    pub customer_uuid: CustomerUuid,
    pub items: CartItems,
    pub subtotal: u64,
    pub item_count: u64,
    pub has_unavailable_items: bool,
    pub has_price_changes: bool,
    pub unavailable_count: u32,
    pub version: i64,
    pub last_item_change: Option<Timestamp>,
    pub last_validated_at: Option<Timestamp>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Cart {
    /// When the customer last changed the cart's content. Rows written before
    /// item changes were tracked fall back to the last modification.
    #[must_use]
    pub fn last_activity(&self) -> Timestamp {
        self.last_item_change.unwrap_or(self.updated_at)
    }
}

/// Just enough of a cart to schedule work against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRef {
    pub uuid: CartUuid,
    pub tenant_uuid: TenantUuid,
    pub customer_uuid: CustomerUuid,
    pub last_validated_at: Option<Timestamp>,
}

/// Result of a bulk item operation: the stored cart and how many lines the
/// operation touched.
#[derive(Debug, Clone, PartialEq)]
pub struct CartChange {
    pub cart: Cart,
    pub affected: usize,
}
