//! Cart Responses

use std::string::ToString;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cartkeeper_app::domain::{
    carts::models::{Cart, CartChange, CartItem},
    validation::models::{PriceChange, ValidatedItem, ValidationResult},
};

/// Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    /// The unique identifier of the cart
    pub uuid: Uuid,

    /// The customer who owns the cart
    pub customer_uuid: Uuid,

    /// The lines in the cart, in the order they were added
    pub items: Vec<CartItemResponse>,

    /// Sum of every line at its current price, in minor units
    pub subtotal: u64,

    /// Total quantity across every line
    pub item_count: u64,

    pub has_unavailable_items: bool,
    pub has_price_changes: bool,
    pub unavailable_count: u32,

    /// The last time a customer changed the cart's lines
    pub last_item_change: Option<String>,

    /// The last time the cart was checked against the catalog
    pub last_validated_at: Option<String>,

    /// When the cart will be deleted if left alone
    pub expires_at: String,

    pub created_at: String,
    pub updated_at: String,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            uuid: cart.uuid.into_uuid(),
            customer_uuid: cart.customer_uuid.into_uuid(),
            items: cart
                .items
                .into_vec()
                .into_iter()
                .map(CartItemResponse::from)
                .collect(),
            subtotal: cart.subtotal,
            item_count: cart.item_count,
            has_unavailable_items: cart.has_unavailable_items,
            has_price_changes: cart.has_price_changes,
            unavailable_count: cart.unavailable_count,
            last_item_change: cart.last_item_change.as_ref().map(ToString::to_string),
            last_validated_at: cart.last_validated_at.as_ref().map(ToString::to_string),
            expires_at: cart.expires_at.to_string(),
            created_at: cart.created_at.to_string(),
            updated_at: cart.updated_at.to_string(),
        }
    }
}

/// Cart Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    /// The unique identifier of the line
    pub uuid: Uuid,

    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub image: Option<String>,

    /// Current unit price, in minor units
    pub price: u64,

    /// Unit price when the line was added or last accepted
    pub price_at_add: u64,

    pub quantity: u32,

    /// One of `AVAILABLE`, `UNAVAILABLE`, `OUT_OF_STOCK`, `LOW_STOCK` or
    /// `PRICE_CHANGED`
    pub status: String,

    pub status_message: Option<String>,

    /// Units in stock when the catalog last reported a tracked quantity
    pub available_stock: Option<i64>,

    pub added_at: String,
    pub last_validated_at: Option<String>,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            uuid: item.uuid.into_uuid(),
            product_id: item.product_id,
            variant_id: item.variant_id,
            name: item.name,
            sku: item.sku,
            image: item.image,
            price: item.price,
            price_at_add: item.price_at_add,
            quantity: item.quantity,
            status: item.status.as_str().to_string(),
            status_message: item.status_message,
            available_stock: item.available_stock,
            added_at: item.added_at.to_string(),
            last_validated_at: item.last_validated_at.as_ref().map(ToString::to_string),
        }
    }
}

/// Cart Change Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartChangeResponse {
    /// The cart after the change
    pub cart: CartResponse,

    /// Number of lines removed or repriced
    pub affected: usize,
}

impl From<CartChange> for CartChangeResponse {
    fn from(change: CartChange) -> Self {
        Self {
            cart: change.cart.into(),
            affected: change.affected,
        }
    }
}

/// Price Change Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PriceChangeResponse {
    pub old_price: u64,
    pub new_price: u64,

    /// `new_price - old_price`; negative for a price drop
    pub difference: i64,

    pub is_increase: bool,
}

impl From<PriceChange> for PriceChangeResponse {
    fn from(change: PriceChange) -> Self {
        Self {
            old_price: change.old_price,
            new_price: change.new_price,
            difference: change.difference,
            is_increase: change.is_increase,
        }
    }
}

/// Validated Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ValidatedItemResponse {
    pub item: CartItemResponse,

    /// Present when the line's price differs from its price at add
    pub price_change: Option<PriceChangeResponse>,
}

impl From<ValidatedItem> for ValidatedItemResponse {
    fn from(validated: ValidatedItem) -> Self {
        Self {
            item: validated.item.into(),
            price_change: validated.price_change.map(PriceChangeResponse::from),
        }
    }
}

/// Validation Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ValidationResponse {
    pub cart_uuid: Uuid,
    pub items: Vec<ValidatedItemResponse>,
    pub has_unavailable_items: bool,
    pub has_price_changes: bool,
    pub unavailable_count: u32,
    pub out_of_stock_count: u32,
    pub low_stock_count: u32,
    pub price_changed_count: u32,

    /// Subtotal at each line's price at add
    pub original_subtotal: u64,

    /// Subtotal at current prices
    pub current_subtotal: u64,

    /// Lines whose status or price changed during this validation
    pub items_updated: u32,

    pub validated_at: String,
    pub expires_at: String,
}

impl From<ValidationResult> for ValidationResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            cart_uuid: result.cart_uuid.into_uuid(),
            items: result
                .items
                .into_iter()
                .map(ValidatedItemResponse::from)
                .collect(),
            has_unavailable_items: result.has_unavailable_items,
            has_price_changes: result.has_price_changes,
            unavailable_count: result.unavailable_count,
            out_of_stock_count: result.out_of_stock_count,
            low_stock_count: result.low_stock_count,
            price_changed_count: result.price_changed_count,
            original_subtotal: result.original_subtotal,
            current_subtotal: result.current_subtotal,
            items_updated: result.items_updated,
            validated_at: result.validated_at.to_string(),
            expires_at: result.expires_at.to_string(),
        }
    }
}
