//! Item availability rules.
//!
//! The first matching rule decides a line's status:
//!
//! 1. missing or soft-deleted product: unavailable
//! 2. product not in a published lifecycle status: unavailable
//! 3. tracked stock at or below zero: out of stock
//! 4. tracked stock below the requested quantity: low stock
//! 5. inventory status reports out of stock: out of stock, overriding 4
//! 6. still purchasable but priced differently than at add: price changed
//! 7. otherwise available

use jiff::Timestamp;

use crate::domain::{
    carts::{
        messages,
        models::{CartItem, CartItemStatus},
    },
    catalog::models::ProductLookup,
    validation::models::{PriceChange, ValidatedItem},
};

/// Decide the status of one line from its catalog lookup.
///
/// `lookup` is `None` when the catalog returned nothing at all for the
/// product.
#[must_use]
pub fn assess_item(
    item: &CartItem,
    lookup: Option<&ProductLookup>,
    now: Timestamp,
) -> ValidatedItem {
    let mut validated = item.clone();

    validated.last_validated_at = Some(now);

    let unavailable = |mut validated: CartItem, message: &str| {
        validated.status = CartItemStatus::Unavailable;
        validated.status_message = Some(message.to_string());

        ValidatedItem {
            item: validated,
            price_change: None,
        }
    };

    let Some(lookup) = lookup else {
        return unavailable(validated, messages::VALIDATION_FAILED);
    };

    let Some(product) = lookup.product() else {
        return unavailable(validated, messages::PRODUCT_NOT_FOUND);
    };

    validated.price = product.price;

    if !product.name.is_empty() {
        validated.name.clone_from(&product.name);
    }

    if let Some(image) = product.images.first() {
        validated.image = Some(image.clone());
    }

    if product.is_deleted() {
        return unavailable(validated, messages::PRODUCT_REMOVED);
    }

    if !product.is_published() {
        return unavailable(validated, messages::NOT_FOR_SALE);
    }

    let mut status = CartItemStatus::Available;
    let mut message = None;

    if let Some(stock) = product.quantity {
        validated.available_stock = Some(stock);

        if stock <= 0 {
            status = CartItemStatus::OutOfStock;
            message = Some(messages::OUT_OF_STOCK.to_string());
        } else if stock < i64::from(item.quantity) {
            status = CartItemStatus::LowStock;
            message = Some(messages::low_stock(stock));
        }
    }

    if product.is_inventory_out_of_stock() {
        status = CartItemStatus::OutOfStock;
        message = Some(messages::OUT_OF_STOCK.to_string());
    }

    let mut price_change = None;

    if status.is_purchasable() && item.price_at_add > 0 && product.price != item.price_at_add {
        status = CartItemStatus::PriceChanged;
        message = Some(messages::price_change(item.price_at_add, product.price));
        price_change = Some(PriceChange::between(item.price_at_add, product.price));
    }

    validated.status = status;
    validated.status_message = message;

    ValidatedItem {
        item: validated,
        price_change,
    }
}
