//! Customer-facing reasons attached to cart items.

pub const PRODUCT_NOT_FOUND: &str = "Product not found or has been removed";
pub const PRODUCT_REMOVED: &str = "Product has been removed";
pub const NOT_FOR_SALE: &str = "Product is not available for purchase";
pub const NO_LONGER_AVAILABLE: &str = "Product is no longer available";
pub const OUT_OF_STOCK: &str = "Product is out of stock";
pub const VALIDATION_FAILED: &str = "Product validation failed";

#[must_use]
pub fn low_stock(available: i64) -> String {
    format!("Only {available} available")
}

#[must_use]
pub fn price_change(old: u64, new: u64) -> String {
    let direction = if new > old { "increased" } else { "decreased" };

    format!(
        "Price {direction} from {} to {}",
        format_amount(old),
        format_amount(new)
    )
}

/// Render minor units with two decimals, e.g. `1250` as `12.50`.
#[must_use]
pub fn format_amount(minor_units: u64) -> String {
    format!("{}.{:02}", minor_units / 100, minor_units % 100)
}
