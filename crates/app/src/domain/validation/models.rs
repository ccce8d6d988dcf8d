//! Validation Models

use jiff::Timestamp;

use crate::domain::carts::models::{CartItem, CartItemStatus, CartUuid};

/// Drift between the price at add and the live price, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceChange {
    pub old_price: u64,
    pub new_price: u64,

    /// `new_price - old_price`, negative for a decrease.
    pub difference: i64,

    pub is_increase: bool,
}

impl PriceChange {
    #[must_use]
    pub fn between(old_price: u64, new_price: u64) -> Self {
        let difference = if new_price >= old_price {
            i64::try_from(new_price - old_price).unwrap_or(i64::MAX)
        } else {
            i64::try_from(old_price - new_price).map_or(i64::MIN, |delta| -delta)
        };

        Self {
            old_price,
            new_price,
            difference,
            is_increase: new_price > old_price,
        }
    }
}

/// A cart line after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    pub item: CartItem,
    pub price_change: Option<PriceChange>,
}

/// Outcome of validating one cart.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub cart_uuid: CartUuid,
    pub items: Vec<ValidatedItem>,
    pub has_unavailable_items: bool,
    pub has_price_changes: bool,

    /// Lines that cannot be purchased, out-of-stock included.
    pub unavailable_count: u32,

    pub out_of_stock_count: u32,
    pub low_stock_count: u32,
    pub price_changed_count: u32,

    /// Subtotal at price-at-add, in minor units.
    pub original_subtotal: u64,

    /// Subtotal at live prices, in minor units.
    pub current_subtotal: u64,

    /// Lines whose status, price or stock differ from what was stored.
    pub items_updated: u32,

    pub validated_at: Timestamp,
    pub expires_at: Timestamp,
}

impl ValidationResult {
    /// Summarise validated lines. `previous` is the stored list in the same
    /// order, used to count what changed.
    #[must_use]
    pub fn summarise(
        cart_uuid: CartUuid,
        previous: &[CartItem],
        items: Vec<ValidatedItem>,
        validated_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        let mut result = Self {
            cart_uuid,
            items: Vec::new(),
            has_unavailable_items: false,
            has_price_changes: false,
            unavailable_count: 0,
            out_of_stock_count: 0,
            low_stock_count: 0,
            price_changed_count: 0,
            original_subtotal: 0,
            current_subtotal: 0,
            items_updated: 0,
            validated_at,
            expires_at,
        };

        for (index, validated) in items.iter().enumerate() {
            let item = &validated.item;

            match item.status {
                CartItemStatus::Unavailable => result.unavailable_count += 1,
                CartItemStatus::OutOfStock => {
                    result.unavailable_count += 1;
                    result.out_of_stock_count += 1;
                }
                CartItemStatus::LowStock => result.low_stock_count += 1,
                CartItemStatus::PriceChanged => result.price_changed_count += 1,
                CartItemStatus::Available => {}
            }

            let changed = previous.get(index).is_none_or(|before| {
                before.status != item.status
                    || before.price != item.price
                    || before.available_stock != item.available_stock
            });

            if changed {
                result.items_updated += 1;
            }

            result.original_subtotal = result
                .original_subtotal
                .saturating_add(item.baseline_line_total());
            result.current_subtotal = result.current_subtotal.saturating_add(item.line_total());
        }

        result.has_unavailable_items = result.unavailable_count > 0;
        result.has_price_changes = result.price_changed_count > 0;
        result.items = items;

        result
    }

    /// Result for a cart with no lines.
    #[must_use]
    pub fn empty(cart_uuid: CartUuid, validated_at: Timestamp, expires_at: Timestamp) -> Self {
        Self::summarise(cart_uuid, &[], Vec::new(), validated_at, expires_at)
    }
}
