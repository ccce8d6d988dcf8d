//! Catalog event payloads.

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::tenants::records::TenantUuid;

/// Lifecycle statuses that take a product off sale.
pub const UNPUBLISHED_STATUSES: [&str; 2] = ["DRAFT", "ARCHIVED"];

/// The two independent event classes carts react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStream {
    Products,
    Inventory,
}

impl EventStream {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "PRODUCT_EVENTS",
            Self::Inventory => "INVENTORY_EVENTS",
        }
    }

    /// Subject prefix of the stream's events, e.g. `product.updated`.
    #[must_use]
    pub const fn subject_prefix(self) -> &'static str {
        match self {
            Self::Products => "product",
            Self::Inventory => "inventory",
        }
    }

    /// Broker topic carrying the stream.
    #[must_use]
    pub const fn topic(self) -> &'static str {
        match self {
            Self::Products => "product-events",
            Self::Inventory => "inventory-events",
        }
    }

    /// Suffix of the stream's durable consumer name.
    #[must_use]
    pub const fn consumer_suffix(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Inventory => "inventory",
        }
    }
}

impl Display for EventStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Strip an optional `{prefix}.` from an event type.
fn bare_event_type<'a>(event_type: &'a str, prefix: &str) -> &'a str {
    event_type
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(event_type)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductEventKind {
    Deleted,
    Archived,
    Updated,
    Other(String),
}

impl ProductEventKind {
    /// Accepts both `product.deleted` and bare `deleted`.
    #[must_use]
    pub fn parse(event_type: &str) -> Self {
        match bare_event_type(event_type, EventStream::Products.subject_prefix()) {
            "deleted" => Self::Deleted,
            "archived" => Self::Archived,
            "updated" => Self::Updated,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEventKind {
    OutOfStock,
    LowStock,
    Restocked,
    Other(String),
}

impl InventoryEventKind {
    /// Accepts both `inventory.low_stock` and bare `low_stock`.
    #[must_use]
    pub fn parse(event_type: &str) -> Self {
        match bare_event_type(event_type, EventStream::Inventory.subject_prefix()) {
            "out_of_stock" => Self::OutOfStock,
            "low_stock" => Self::LowStock,
            "restocked" => Self::Restocked,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct TenantOnly {
    #[serde(rename = "tenantId")]
    tenant_uuid: Option<TenantUuid>,
}

/// The tenant named by a payload, read without decoding the rest of it.
#[must_use]
pub fn tenant_of(payload: &[u8]) -> Option<TenantUuid> {
    serde_json::from_slice::<TenantOnly>(payload)
        .ok()
        .and_then(|envelope| envelope.tenant_uuid)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEvent {
    pub event_type: String,

    #[serde(rename = "tenantId")]
    pub tenant_uuid: TenantUuid,

    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    pub product_id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// New price in major units, when the update changed it.
    #[serde(default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub status: Option<String>,
}

impl ProductEvent {
    #[must_use]
    pub fn kind(&self) -> ProductEventKind {
        ProductEventKind::parse(&self.event_type)
    }

    /// Whether the update took the product off sale.
    #[must_use]
    pub fn unpublishes(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| UNPUBLISHED_STATUSES.contains(&status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEvent {
    pub event_type: String,

    #[serde(rename = "tenantId")]
    pub tenant_uuid: TenantUuid,

    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    #[serde(default)]
    pub items: Vec<InventoryLevel>,
}

impl InventoryEvent {
    #[must_use]
    pub fn kind(&self) -> InventoryEventKind {
        InventoryEventKind::parse(&self.event_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevel {
    pub product_id: String,

    #[serde(default)]
    pub sku: Option<String>,

    #[serde(default)]
    pub current_stock: i64,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn event_types_parse_with_or_without_prefix() {
        assert_eq!(ProductEventKind::parse("product.deleted"), ProductEventKind::Deleted);
        assert_eq!(ProductEventKind::parse("archived"), ProductEventKind::Archived);
        assert_eq!(
            ProductEventKind::parse("product.created"),
            ProductEventKind::Other("created".to_string())
        );
        assert_eq!(
            InventoryEventKind::parse("inventory.low_stock"),
            InventoryEventKind::LowStock
        );
        assert_eq!(InventoryEventKind::parse("restocked"), InventoryEventKind::Restocked);
    }

    #[test]
    fn reads_tenant_from_partial_payloads() {
        let tenant = TenantUuid::new();
        let payload = format!(r#"{{"tenantId": "{tenant}", "items": "not a list"}}"#);

        assert_eq!(tenant_of(payload.as_bytes()), Some(tenant));
        assert_eq!(tenant_of(b"{}"), None);
        assert_eq!(tenant_of(b"garbage"), None);
    }

    #[test]
    fn decodes_product_update() -> TestResult {
        let tenant = TenantUuid::new();
        let payload = format!(
            r#"{{
                "eventType": "product.updated",
                "tenantId": "{tenant}",
                "timestamp": "2026-03-01T12:00:00Z",
                "productId": "prod-1",
                "price": 12.5,
                "status": "ARCHIVED"
            }}"#
        );

        let event: ProductEvent = serde_json::from_str(&payload)?;

        assert_eq!(event.tenant_uuid, tenant);
        assert_eq!(event.kind(), ProductEventKind::Updated);
        assert_eq!(event.price, Some(Decimal::new(125, 1)));
        assert!(event.unpublishes(), "archived products are off sale");

        Ok(())
    }

    #[test]
    fn decodes_inventory_levels() -> TestResult {
        let tenant = TenantUuid::new();
        let payload = format!(
            r#"{{
                "eventType": "low_stock",
                "tenantId": "{tenant}",
                "items": [{{"productId": "prod-1", "sku": "MUG-1", "currentStock": 2}}]
            }}"#
        );

        let event: InventoryEvent = serde_json::from_str(&payload)?;

        assert_eq!(event.kind(), InventoryEventKind::LowStock);
        assert_eq!(
            event.items,
            vec![InventoryLevel {
                product_id: "prod-1".to_string(),
                sku: Some("MUG-1".to_string()),
                current_stock: 2,
            }]
        );

        Ok(())
    }
}
