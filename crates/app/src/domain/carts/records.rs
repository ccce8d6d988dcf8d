//! Cart Records

use jiff::Timestamp;

use crate::domain::{
    carts::models::{Cart, CartItems, CartUuid, ItemsDocumentError},
    customers::records::CustomerUuid,
    tenants::records::TenantUuid,
};

/// A cart row as stored, with its item document still undecoded so one
/// corrupt document cannot fail a whole page of rows.
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub tenant_uuid: TenantUuid,
    pub customer_uuid: CustomerUuid,
    pub items: serde_json::Value,
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

impl TryFrom<CartRecord> for Cart {
    type Error = ItemsDocumentError;

    fn try_from(record: CartRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: record.uuid,
            tenant_uuid: record.tenant_uuid,
            customer_uuid: record.customer_uuid,
            items: CartItems::from_document(record.items)?,
            subtotal: record.subtotal,
            item_count: record.item_count,
            has_unavailable_items: record.has_unavailable_items,
            has_price_changes: record.has_price_changes,
            unavailable_count: record.unavailable_count,
            version: record.version,
            last_item_change: record.last_item_change,
            last_validated_at: record.last_validated_at,
            expires_at: record.expires_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
