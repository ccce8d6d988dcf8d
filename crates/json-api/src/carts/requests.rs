//! Cart Requests

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};

use cartkeeper_app::domain::carts::data::NewCartItem;

/// Cart Item Request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemRequest {
    /// Catalog product identifier
    pub product_id: String,

    /// Catalog variant identifier, when the product has variants
    pub variant_id: Option<String>,

    pub name: String,
    pub sku: Option<String>,
    pub image: Option<String>,

    /// Unit price shown to the customer, in minor units
    pub price: u64,

    pub quantity: u32,
}

impl From<CartItemRequest> for NewCartItem {
    fn from(request: CartItemRequest) -> Self {
        Self {
            product_id: request.product_id,
            variant_id: request.variant_id,
            name: request.name,
            sku: request.sku,
            image: request.image,
            price: request.price,
            quantity: request.quantity,
        }
    }
}

/// Sync Cart Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SyncCartRequest {
    /// The storefront's complete list of lines
    pub items: Vec<CartItemRequest>,
}

/// Update Item Quantity Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateQuantityRequest {
    /// New quantity; zero or less removes the line
    pub quantity: i64,
}
