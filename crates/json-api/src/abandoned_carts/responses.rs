//! Abandoned Cart Responses

use std::string::ToString;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cartkeeper_app::domain::abandoned_carts::{
    ReminderRun,
    models::{
        AbandonedCart, AbandonedCartDetails, AbandonedCartPage, AbandonedCartSettings,
        AbandonedCartStats, RecoveryAttempt,
    },
};

use crate::carts::responses::CartItemResponse;

/// Abandoned Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AbandonedCartResponse {
    pub uuid: Uuid,
    pub cart_uuid: Uuid,
    pub customer_uuid: Uuid,

    /// One of `PENDING`, `REMINDED`, `RECOVERED` or `EXPIRED`
    pub status: String,

    /// The cart's lines when it was abandoned
    pub items: Vec<CartItemResponse>,
    pub subtotal: u64,
    pub item_count: u64,

    pub customer_email: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,

    pub abandoned_at: String,
    pub last_cart_activity: String,

    pub reminder_count: u32,
    pub last_reminder_at: Option<String>,
    pub next_reminder_at: Option<String>,

    pub recovered_at: Option<String>,
    pub recovered_order_id: Option<String>,
    pub recovery_source: Option<String>,
    pub discount_used: Option<String>,
    pub recovered_value: Option<u64>,
    pub expired_at: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

impl From<AbandonedCart> for AbandonedCartResponse {
    fn from(cart: AbandonedCart) -> Self {
        Self {
            uuid: cart.uuid.into_uuid(),
            cart_uuid: cart.cart_uuid.into_uuid(),
            customer_uuid: cart.customer_uuid.into_uuid(),
            status: cart.status.as_str().to_string(),
            items: cart
                .items
                .into_vec()
                .into_iter()
                .map(CartItemResponse::from)
                .collect(),
            subtotal: cart.subtotal,
            item_count: cart.item_count,
            customer_email: cart.customer_email,
            customer_first_name: cart.customer_first_name,
            customer_last_name: cart.customer_last_name,
            abandoned_at: cart.abandoned_at.to_string(),
            last_cart_activity: cart.last_cart_activity.to_string(),
            reminder_count: cart.reminder_count,
            last_reminder_at: cart.last_reminder_at.as_ref().map(ToString::to_string),
            next_reminder_at: cart.next_reminder_at.as_ref().map(ToString::to_string),
            recovered_at: cart.recovered_at.as_ref().map(ToString::to_string),
            recovered_order_id: cart.recovered_order_id,
            recovery_source: cart.recovery_source,
            discount_used: cart.discount_used,
            recovered_value: cart.recovered_value,
            expired_at: cart.expired_at.as_ref().map(ToString::to_string),
            created_at: cart.created_at.to_string(),
            updated_at: cart.updated_at.to_string(),
        }
    }
}

/// Recovery Attempt Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RecoveryAttemptResponse {
    pub uuid: Uuid,
    pub abandoned_cart_uuid: Uuid,
    pub channel: String,
    pub attempt_number: u32,

    /// One of `SENT`, `DELIVERED`, `OPENED`, `CLICKED` or `FAILED`
    pub status: String,

    pub template_name: String,
    pub discount_code: Option<String>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: String,
    pub delivered_at: Option<String>,
    pub opened_at: Option<String>,
    pub clicked_at: Option<String>,
}

impl From<RecoveryAttempt> for RecoveryAttemptResponse {
    fn from(attempt: RecoveryAttempt) -> Self {
        Self {
            uuid: attempt.uuid.into_uuid(),
            abandoned_cart_uuid: attempt.abandoned_cart_uuid.into_uuid(),
            channel: attempt.channel.as_str().to_string(),
            attempt_number: attempt.attempt_number,
            status: attempt.status.as_str().to_string(),
            template_name: attempt.template_name,
            discount_code: attempt.discount_code,
            external_id: attempt.external_id,
            error_message: attempt.error_message,
            sent_at: attempt.sent_at.to_string(),
            delivered_at: attempt.delivered_at.as_ref().map(ToString::to_string),
            opened_at: attempt.opened_at.as_ref().map(ToString::to_string),
            clicked_at: attempt.clicked_at.as_ref().map(ToString::to_string),
        }
    }
}

/// Abandoned Cart Details Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AbandonedCartDetailsResponse {
    pub abandoned_cart: AbandonedCartResponse,

    /// Reminders sent for this episode, oldest first
    pub attempts: Vec<RecoveryAttemptResponse>,
}

impl From<AbandonedCartDetails> for AbandonedCartDetailsResponse {
    fn from(details: AbandonedCartDetails) -> Self {
        Self {
            abandoned_cart: details.cart.into(),
            attempts: details
                .attempts
                .into_iter()
                .map(RecoveryAttemptResponse::from)
                .collect(),
        }
    }
}

/// Abandoned Cart Page Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AbandonedCartPageResponse {
    pub abandoned_carts: Vec<AbandonedCartResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<AbandonedCartPage> for AbandonedCartPageResponse {
    fn from(page: AbandonedCartPage) -> Self {
        let total_pages = page.total_pages();

        Self {
            abandoned_carts: page
                .carts
                .into_iter()
                .map(AbandonedCartResponse::from)
                .collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

/// Abandoned Cart Stats Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AbandonedCartStatsResponse {
    pub total_abandoned: u64,
    pub total_recovered: u64,

    /// Recovered as a percentage of abandoned
    pub recovery_rate: f64,

    pub total_abandoned_value: u64,
    pub total_recovered_value: u64,
    pub pending_count: u64,
}

impl From<AbandonedCartStats> for AbandonedCartStatsResponse {
    fn from(stats: AbandonedCartStats) -> Self {
        Self {
            total_abandoned: stats.total_abandoned,
            total_recovered: stats.total_recovered,
            recovery_rate: stats.recovery_rate,
            total_abandoned_value: stats.total_abandoned_value,
            total_recovered_value: stats.total_recovered_value,
            pending_count: stats.pending_count,
        }
    }
}

/// Abandoned Cart Settings
///
/// Used for both reading and replacing a tenant's settings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct SettingsPayload {
    pub enabled: bool,
    pub abandonment_threshold_minutes: u32,
    pub expiration_days: u32,
    pub first_reminder_hours: u32,
    pub second_reminder_hours: u32,
    pub third_reminder_hours: u32,
    pub max_reminders: u32,

    /// Reminder number that carries the discount; zero disables it
    pub offer_discount_on_reminder: u32,

    /// `PERCENTAGE` or `FIXED_AMOUNT`
    pub discount_type: Option<String>,
    pub discount_value: Option<u64>,
    pub discount_code: Option<String>,

    pub first_reminder_template: String,
    pub second_reminder_template: String,
    pub third_reminder_template: String,
}

impl From<AbandonedCartSettings> for SettingsPayload {
    fn from(settings: AbandonedCartSettings) -> Self {
        Self {
            enabled: settings.enabled,
            abandonment_threshold_minutes: settings.abandonment_threshold_minutes,
            expiration_days: settings.expiration_days,
            first_reminder_hours: settings.first_reminder_hours,
            second_reminder_hours: settings.second_reminder_hours,
            third_reminder_hours: settings.third_reminder_hours,
            max_reminders: settings.max_reminders,
            offer_discount_on_reminder: settings.offer_discount_on_reminder,
            discount_type: settings
                .discount_type
                .map(|discount| discount.as_str().to_string()),
            discount_value: settings.discount_value,
            discount_code: settings.discount_code,
            first_reminder_template: settings.first_reminder_template,
            second_reminder_template: settings.second_reminder_template,
            third_reminder_template: settings.third_reminder_template,
        }
    }
}

/// Reminder Run Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ReminderRunResponse {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl From<ReminderRun> for ReminderRunResponse {
    fn from(run: ReminderRun) -> Self {
        Self {
            sent: run.sent,
            failed: run.failed,
            skipped: run.skipped,
        }
    }
}

/// Count Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CountResponse {
    /// Number of abandoned carts affected
    pub count: u64,
}
