//! HTTP client for the product service's batch lookup.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, header::ACCEPT};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{
    catalog::{
        errors::ProductGatewayError,
        models::{ProductInfo, ProductLookup},
    },
    tenants::records::TenantUuid,
};

/// Name this service reports in `X-Internal-Service`.
pub const INTERNAL_SERVICE_NAME: &str = "cartkeeper";

/// Default request timeout for catalog calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for connecting to the product service.
#[derive(Debug, Clone)]
pub struct ProductServiceConfig {
    /// Base address, e.g. `"http://products-service:8083"`.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// Raw, uncached access to product details.
#[automock]
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetch the given product IDs in one call.
    async fn fetch_products(
        &self,
        tenant: TenantUuid,
        product_ids: &[String],
    ) -> Result<Vec<ProductLookup>, ProductGatewayError>;
}

#[derive(Debug, Clone)]
pub struct HttpProductSource {
    base_url: String,
    http: Client,
}

impl HttpProductSource {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: ProductServiceConfig) -> Result<Self, ProductGatewayError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl ProductSource for HttpProductSource {
    async fn fetch_products(
        &self,
        tenant: TenantUuid,
        product_ids: &[String],
    ) -> Result<Vec<ProductLookup>, ProductGatewayError> {
        let url = format!("{}/api/v1/products/batch", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("ids", product_ids.join(",")),
                ("includeVariants", "false".to_string()),
            ])
            .header("X-Tenant-ID", tenant.to_string())
            .header("X-Internal-Service", INTERNAL_SERVICE_NAME)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ProductGatewayError::UnexpectedResponse(format!(
                "batch lookup failed with status {status}: {text}"
            )));
        }

        let parsed: BatchProductsResponse = response.json().await?;

        parsed.into_lookups()
    }
}

#[derive(Debug, Deserialize)]
struct BatchProductsResponse {
    success: bool,
    data: Option<BatchProductsData>,
}

#[derive(Debug, Deserialize)]
struct BatchProductsData {
    #[serde(default)]
    products: Vec<BatchProductEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchProductEntry {
    id: String,

    #[serde(default)]
    found: bool,

    #[serde(default)]
    product: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: String,

    #[serde(default)]
    name: String,

    price: Decimal,

    #[serde(default)]
    quantity: Option<i64>,

    #[serde(default)]
    status: String,

    #[serde(default)]
    inventory_status: Option<String>,

    #[serde(default)]
    images: Vec<String>,

    #[serde(default)]
    deleted_at: Option<String>,
}

impl BatchProductsResponse {
    fn into_lookups(self) -> Result<Vec<ProductLookup>, ProductGatewayError> {
        let data = match self.data {
            Some(data) if self.success => data,
            _ => {
                return Err(ProductGatewayError::UnexpectedResponse(
                    "batch lookup reported failure".to_string(),
                ));
            }
        };

        Ok(data
            .products
            .into_iter()
            .map(BatchProductEntry::into_lookup)
            .collect())
    }
}

impl BatchProductEntry {
    /// A found entry whose details fail to decode is kept as found without a
    /// product, which callers treat the same as missing.
    fn into_lookup(self) -> ProductLookup {
        let product = match self.product {
            Some(value) if self.found => match serde_json::from_value::<WireProduct>(value) {
                Ok(wire) => wire.into_product(),
                Err(error) => {
                    debug!(product = %self.id, %error, "undecodable product details");

                    None
                }
            },
            _ => None,
        };

        ProductLookup {
            id: self.id,
            found: self.found,
            product,
        }
    }
}

impl WireProduct {
    fn into_product(self) -> Option<ProductInfo> {
        let price = to_minor_units(self.price)?;

        Some(ProductInfo {
            id: self.id,
            name: self.name,
            price,
            quantity: self.quantity,
            status: self.status,
            inventory_status: self.inventory_status,
            images: self.images,
            deleted_at: self.deleted_at,
        })
    }
}

/// Convert a decimal major-unit price into minor units.
pub(crate) fn to_minor_units(price: Decimal) -> Option<u64> {
    (price * Decimal::ONE_HUNDRED).round().to_u64()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn decodes_batch_envelope() -> TestResult {
        let body: BatchProductsResponse = serde_json::from_value(json!({
            "success": true,
            "data": {
                "products": [
                    {
                        "id": "p-1",
                        "found": true,
                        "product": {
                            "id": "p-1",
                            "name": "Mug",
                            "price": 12.5,
                            "quantity": 3,
                            "status": "ACTIVE",
                            "inventoryStatus": "LOW_STOCK",
                            "images": ["mug.png"]
                        }
                    },
                    { "id": "p-2", "found": false }
                ],
                "summary": { "requested": 2, "found": 1, "notFound": 1 }
            }
        }))?;

        let lookups = body.into_lookups()?;

        assert_eq!(lookups.len(), 2);

        let mug = lookups[0].product().cloned();

        assert_eq!(mug.as_ref().map(|p| p.price), Some(1_250));
        assert_eq!(mug.as_ref().and_then(|p| p.quantity), Some(3));
        assert_eq!(
            mug.and_then(|p| p.inventory_status).as_deref(),
            Some("LOW_STOCK")
        );
        assert_eq!(lookups[1], ProductLookup::missing("p-2"));

        Ok(())
    }

    #[test]
    fn undecodable_product_is_kept_without_details() -> TestResult {
        let body: BatchProductsResponse = serde_json::from_value(json!({
            "success": true,
            "data": {
                "products": [
                    { "id": "p-1", "found": true, "product": { "id": "p-1" } }
                ]
            }
        }))?;

        let lookups = body.into_lookups()?;

        assert!(lookups[0].found, "entry stays found");
        assert!(lookups[0].product().is_none(), "details are dropped");

        Ok(())
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() -> TestResult {
        let body: BatchProductsResponse =
            serde_json::from_value(json!({ "success": false, "data": null }))?;

        let result = body.into_lookups();

        assert!(
            matches!(result, Err(ProductGatewayError::UnexpectedResponse(_))),
            "expected UnexpectedResponse, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn minor_units_round_half_cent() {
        assert_eq!(to_minor_units(Decimal::new(1999, 2)), Some(1_999));
        assert_eq!(to_minor_units(Decimal::new(10, 0)), Some(1_000));
        assert_eq!(to_minor_units(Decimal::new(-1, 0)), None);
    }
}
