//! Notification Models

use crate::domain::{
    abandoned_carts::models::AbandonedCartUuid,
    carts::models::{CartItems, CartUuid},
    customers::records::CustomerUuid,
    tenants::records::TenantUuid,
};

/// Subject used when a reminder carries a discount code.
pub const DISCOUNT_SUBJECT: &str = "Here's a special offer for you!";

/// A reminder about an abandoned cart, addressed to one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub tenant_uuid: TenantUuid,
    pub customer_uuid: CustomerUuid,
    pub abandoned_cart_uuid: AbandonedCartUuid,

    /// The live cart the customer is sent back to.
    pub cart_uuid: CartUuid,

    pub recipient_email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// Snapshot taken when the cart was abandoned.
    pub items: CartItems,
    pub subtotal: u64,
    pub item_count: u64,

    /// 1-based position in the reminder sequence.
    pub reminder_number: u32,
    pub template_name: String,
    pub discount_code: Option<String>,
}

impl ReminderNotification {
    /// Email subject for this reminder.
    #[must_use]
    pub fn subject(&self) -> &'static str {
        if self.discount_code.is_some() {
            return DISCOUNT_SUBJECT;
        }

        match self.reminder_number {
            0 | 1 => "You left something behind!",
            2 => "Still thinking about it?",
            _ => "Last chance to complete your order!",
        }
    }

    /// Name to greet the customer with.
    #[must_use]
    pub fn customer_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !last.is_empty() => format!("{first} {last}"),
            (Some(first), _) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        }
    }
}
