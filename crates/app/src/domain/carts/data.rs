//! Cart Data

use jiff::Timestamp;

use crate::domain::carts::models::{
    CartItem, CartItemStatus, CartItemUuid, CartItems, CartTotals,
};

/// An item as submitted by a storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub image: Option<String>,
    pub price: u64,
    pub quantity: u32,
}

impl NewCartItem {
    /// A fresh line: the current price becomes the price-at-add snapshot.
    #[must_use]
    pub fn into_item(self, now: Timestamp) -> CartItem {
        CartItem {
            uuid: CartItemUuid::new(),
            product_id: self.product_id,
            variant_id: self.variant_id,
            name: self.name,
            sku: self.sku,
            image: self.image,
            price: self.price,
            price_at_add: self.price,
            quantity: self.quantity,
            status: CartItemStatus::Available,
            status_message: None,
            available_stock: None,
            added_at: now,
            last_validated_at: None,
        }
    }
}

#[cfg(test)]
impl NewCartItem {
    pub(crate) fn test_item(product_id: &str, price: u64, quantity: u32) -> Self {
        Self {
            product_id: product_id.to_string(),
            variant_id: None,
            name: format!("Product {product_id}"),
            sku: None,
            image: None,
            price,
            quantity,
        }
    }
}

/// Column values for a cart write. The aggregates are always derived from the
/// encoded items.
#[derive(Debug, Clone)]
pub(crate) struct CartWrite {
    pub(crate) items: serde_json::Value,
    pub(crate) totals: CartTotals,
    pub(crate) last_item_change: Option<Timestamp>,
    pub(crate) expires_at: Option<Timestamp>,
    pub(crate) last_validated_at: Option<Timestamp>,
}

impl CartWrite {
    pub(crate) fn from_items(items: &CartItems) -> Result<Self, serde_json::Error> {
        Ok(Self {
            items: items.to_document()?,
            totals: items.totals(),
            last_item_change: None,
            expires_at: None,
            last_validated_at: None,
        })
    }

    /// Mark the write as a customer content change.
    pub(crate) fn touched(mut self, now: Timestamp, expires_at: Timestamp) -> Self {
        self.last_item_change = Some(now);
        self.expires_at = Some(expires_at);
        self
    }

    pub(crate) fn validated(mut self, at: Option<Timestamp>) -> Self {
        self.last_validated_at = at;
        self
    }
}
