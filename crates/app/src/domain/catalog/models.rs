//! Catalog Models

/// Lifecycle statuses under which a product may be purchased.
pub const PUBLISHED_STATUSES: [&str; 2] = ["ACTIVE", "PUBLISHED"];

/// Inventory status reported for products that cannot be shipped.
pub const INVENTORY_OUT_OF_STOCK: &str = "OUT_OF_STOCK";

/// A product as seen by the catalog at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,

    /// Current price in minor units.
    pub price: u64,

    /// Available stock, when the catalog tracks it.
    pub quantity: Option<i64>,

    pub status: String,
    pub inventory_status: Option<String>,
    pub images: Vec<String>,

    /// Set when the product has been soft-deleted.
    pub deleted_at: Option<String>,
}

impl ProductInfo {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        PUBLISHED_STATUSES.contains(&self.status.as_str())
    }

    #[must_use]
    pub fn is_inventory_out_of_stock(&self) -> bool {
        self.inventory_status.as_deref() == Some(INVENTORY_OUT_OF_STOCK)
    }
}

/// Result of looking up one product ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLookup {
    pub id: String,
    pub found: bool,
    pub product: Option<ProductInfo>,
}

impl ProductLookup {
    #[must_use]
    pub fn found(product: ProductInfo) -> Self {
        Self {
            id: product.id.clone(),
            found: true,
            product: Some(product),
        }
    }

    #[must_use]
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            found: false,
            product: None,
        }
    }

    /// The product, if it was found and its details decoded.
    #[must_use]
    pub fn product(&self) -> Option<&ProductInfo> {
        self.product.as_ref().filter(|_| self.found)
    }
}

#[cfg(test)]
impl ProductInfo {
    pub(crate) fn test_product(id: &str, price: u64, quantity: Option<i64>) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Product {id}"),
            price,
            quantity,
            status: "ACTIVE".to_string(),
            inventory_status: None,
            images: Vec::new(),
            deleted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_statuses_are_purchasable() {
        let mut product = ProductInfo::test_product("p", 100, None);

        assert!(product.is_published(), "ACTIVE is purchasable");

        product.status = "PUBLISHED".to_string();
        assert!(product.is_published(), "PUBLISHED is purchasable");

        product.status = "DRAFT".to_string();
        assert!(!product.is_published(), "DRAFT is not purchasable");
    }

    #[test]
    fn missing_lookup_has_no_product() {
        let lookup = ProductLookup::missing("p");

        assert!(lookup.product().is_none(), "missing lookups carry nothing");
    }
}
