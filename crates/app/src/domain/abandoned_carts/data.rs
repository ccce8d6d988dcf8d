//! Abandoned Cart Data

use jiff::Timestamp;

use crate::domain::{
    abandoned_carts::models::{AbandonedCartUuid, RecoveryAttemptStatus, RecoveryChannel},
    carts::models::{Cart, CartItems, CartUuid},
    customers::records::{CustomerContact, CustomerUuid},
};

/// Snapshot of an inactive cart, taken when it is judged abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAbandonedCart {
    pub cart_uuid: CartUuid,
    pub customer_uuid: CustomerUuid,
    pub items: CartItems,
    pub subtotal: u64,
    pub item_count: u64,
    pub customer_email: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub abandoned_at: Timestamp,
    pub last_cart_activity: Timestamp,
    pub next_reminder_at: Option<Timestamp>,
}

impl NewAbandonedCart {
    #[must_use]
    pub fn snapshot(
        cart: &Cart,
        contact: CustomerContact,
        abandoned_at: Timestamp,
        next_reminder_at: Option<Timestamp>,
    ) -> Self {
        Self {
            cart_uuid: cart.uuid,
            customer_uuid: cart.customer_uuid,
            items: cart.items.clone(),
            subtotal: cart.subtotal,
            item_count: cart.item_count,
            customer_email: contact.email,
            customer_first_name: contact.first_name,
            customer_last_name: contact.last_name,
            abandoned_at,
            last_cart_activity: cart.last_activity(),
            next_reminder_at,
        }
    }
}

/// Advance of an open abandoned cart past one more reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderClaim {
    pub abandoned_cart_uuid: AbandonedCartUuid,

    /// Reminder count the record must still hold.
    pub expected_count: u32,

    pub sent_at: Timestamp,
    pub next_reminder_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecoveryAttempt {
    pub abandoned_cart_uuid: AbandonedCartUuid,
    pub channel: RecoveryChannel,
    pub attempt_number: u32,
    pub status: RecoveryAttemptStatus,
    pub template_name: String,
    pub discount_code: Option<String>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Timestamp,
}
