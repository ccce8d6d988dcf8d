//! Abandoned Cart Records

use jiff::Timestamp;

use crate::domain::{
    abandoned_carts::{
        errors::AbandonedCartsServiceError,
        models::{
            AbandonedCart, AbandonedCartSettings, AbandonedCartUuid, RecoveryAttempt,
            RecoveryAttemptUuid,
        },
    },
    carts::models::{CartItems, CartUuid},
    customers::records::CustomerUuid,
    tenants::records::TenantUuid,
};

/// An abandoned cart row with its status and snapshot still undecoded.
#[derive(Debug, Clone)]
pub struct AbandonedCartRecord {
    pub uuid: AbandonedCartUuid,
    pub tenant_uuid: TenantUuid,
    pub cart_uuid: CartUuid,
    pub customer_uuid: CustomerUuid,
    pub status: String,
    pub items: serde_json::Value,
    pub subtotal: u64,
    pub item_count: u64,
    pub customer_email: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub abandoned_at: Timestamp,
    pub last_cart_activity: Timestamp,
    pub reminder_count: u32,
    pub last_reminder_at: Option<Timestamp>,
    pub next_reminder_at: Option<Timestamp>,
    pub recovered_at: Option<Timestamp>,
    pub recovered_order_id: Option<String>,
    pub recovery_source: Option<String>,
    pub discount_used: Option<String>,
    pub recovered_value: Option<u64>,
    pub expired_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AbandonedCartRecord> for AbandonedCart {
    type Error = AbandonedCartsServiceError;

    fn try_from(record: AbandonedCartRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: record.uuid,
            tenant_uuid: record.tenant_uuid,
            cart_uuid: record.cart_uuid,
            customer_uuid: record.customer_uuid,
            status: record.status.parse()?,
            items: CartItems::from_document(record.items)?,
            subtotal: record.subtotal,
            item_count: record.item_count,
            customer_email: record.customer_email,
            customer_first_name: record.customer_first_name,
            customer_last_name: record.customer_last_name,
            abandoned_at: record.abandoned_at,
            last_cart_activity: record.last_cart_activity,
            reminder_count: record.reminder_count,
            last_reminder_at: record.last_reminder_at,
            next_reminder_at: record.next_reminder_at,
            recovered_at: record.recovered_at,
            recovered_order_id: record.recovered_order_id,
            recovery_source: record.recovery_source,
            discount_used: record.discount_used,
            recovered_value: record.recovered_value,
            expired_at: record.expired_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryAttemptRecord {
    pub uuid: RecoveryAttemptUuid,
    pub tenant_uuid: TenantUuid,
    pub abandoned_cart_uuid: AbandonedCartUuid,
    pub channel: String,
    pub attempt_number: u32,
    pub status: String,
    pub template_name: String,
    pub discount_code: Option<String>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Timestamp,
    pub delivered_at: Option<Timestamp>,
    pub opened_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<RecoveryAttemptRecord> for RecoveryAttempt {
    type Error = AbandonedCartsServiceError;

    fn try_from(record: RecoveryAttemptRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: record.uuid,
            tenant_uuid: record.tenant_uuid,
            abandoned_cart_uuid: record.abandoned_cart_uuid,
            channel: record.channel.parse()?,
            attempt_number: record.attempt_number,
            status: record.status.parse()?,
            template_name: record.template_name,
            discount_code: record.discount_code,
            external_id: record.external_id,
            error_message: record.error_message,
            sent_at: record.sent_at,
            delivered_at: record.delivered_at,
            opened_at: record.opened_at,
            clicked_at: record.clicked_at,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettingsRecord {
    pub enabled: bool,
    pub abandonment_threshold_minutes: u32,
    pub expiration_days: u32,
    pub first_reminder_hours: u32,
    pub second_reminder_hours: u32,
    pub third_reminder_hours: u32,
    pub max_reminders: u32,
    pub offer_discount_on_reminder: u32,
    pub discount_type: Option<String>,
    pub discount_value: Option<u64>,
    pub discount_code: Option<String>,
    pub first_reminder_template: String,
    pub second_reminder_template: String,
    pub third_reminder_template: String,
}

impl TryFrom<SettingsRecord> for AbandonedCartSettings {
    type Error = AbandonedCartsServiceError;

    fn try_from(record: SettingsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: record.enabled,
            abandonment_threshold_minutes: record.abandonment_threshold_minutes,
            expiration_days: record.expiration_days,
            first_reminder_hours: record.first_reminder_hours,
            second_reminder_hours: record.second_reminder_hours,
            third_reminder_hours: record.third_reminder_hours,
            max_reminders: record.max_reminders,
            offer_discount_on_reminder: record.offer_discount_on_reminder,
            discount_type: record
                .discount_type
                .as_deref()
                .map(str::parse)
                .transpose()?,
            discount_value: record.discount_value,
            discount_code: record.discount_code,
            first_reminder_template: record.first_reminder_template,
            second_reminder_template: record.second_reminder_template,
            third_reminder_template: record.third_reminder_template,
        })
    }
}
