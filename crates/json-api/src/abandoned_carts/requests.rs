//! Abandoned Cart Requests

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cartkeeper_app::domain::abandoned_carts::models::{
    AbandonedCartSettings, RecoveryDetails, UnknownStatus,
};

use super::responses::SettingsPayload;

impl TryFrom<SettingsPayload> for AbandonedCartSettings {
    type Error = UnknownStatus;

    fn try_from(payload: SettingsPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: payload.enabled,
            abandonment_threshold_minutes: payload.abandonment_threshold_minutes,
            expiration_days: payload.expiration_days,
            first_reminder_hours: payload.first_reminder_hours,
            second_reminder_hours: payload.second_reminder_hours,
            third_reminder_hours: payload.third_reminder_hours,
            max_reminders: payload.max_reminders,
            offer_discount_on_reminder: payload.offer_discount_on_reminder,
            discount_type: payload
                .discount_type
                .as_deref()
                .map(str::parse)
                .transpose()?,
            discount_value: payload.discount_value,
            discount_code: payload.discount_code,
            first_reminder_template: payload.first_reminder_template,
            second_reminder_template: payload.second_reminder_template,
            third_reminder_template: payload.third_reminder_template,
        })
    }
}

/// Send Reminders Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct SendRemindersRequest {
    /// Abandoned carts to remind; every due record when omitted
    pub abandoned_cart_uuids: Option<Vec<Uuid>>,
}

/// Mark Recovered Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct MarkRecoveredRequest {
    /// The live cart the order was placed from
    pub cart_uuid: Uuid,

    pub order_id: String,

    /// Where the customer came back from, e.g. `email`
    pub source: Option<String>,

    pub discount_used: Option<String>,

    /// Order value in minor units
    pub value: u64,
}

impl From<MarkRecoveredRequest> for RecoveryDetails {
    fn from(request: MarkRecoveredRequest) -> Self {
        Self {
            order_id: request.order_id,
            source: request.source,
            discount_used: request.discount_used,
            value: request.value,
        }
    }
}

/// Update Attempt Status Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateAttemptStatusRequest {
    /// One of `DELIVERED`, `OPENED`, `CLICKED` or `FAILED`
    pub status: String,

    /// Provider error, recorded with a `FAILED` status
    pub error_message: Option<String>,
}
