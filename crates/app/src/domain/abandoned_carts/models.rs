//! Abandoned Cart Models

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        carts::models::{CartItems, CartUuid},
        customers::records::CustomerUuid,
        tenants::records::TenantUuid,
    },
    uuids::TypedUuid,
};

/// Abandoned Cart UUID
pub type AbandonedCartUuid = TypedUuid<AbandonedCart>;

/// Recovery Attempt UUID
pub type RecoveryAttemptUuid = TypedUuid<RecoveryAttempt>;

/// Default page size when listing abandoned carts.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A status string that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status `{0}`")]
pub struct UnknownStatus(pub String);

/// Lifecycle of one abandonment episode. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbandonedCartStatus {
    Pending,
    Reminded,
    Recovered,
    Expired,
}

impl AbandonedCartStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Reminded => "REMINDED",
            Self::Recovered => "RECOVERED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Pending and reminded episodes can still be recovered.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Reminded)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Reminded) | (Self::Reminded, Self::Reminded) => true,
            (Self::Pending | Self::Reminded, Self::Recovered | Self::Expired) => true,
            _ => false,
        }
    }
}

impl Display for AbandonedCartStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbandonedCartStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "REMINDED" => Ok(Self::Reminded),
            "RECOVERED" => Ok(Self::Recovered),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Delivery lifecycle of one reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAttemptStatus {
    Sent,
    Delivered,
    Opened,
    Clicked,
    Failed,
}

impl RecoveryAttemptStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Opened => "OPENED",
            Self::Clicked => "CLICKED",
            Self::Failed => "FAILED",
        }
    }

    const fn rank(self) -> Option<u8> {
        match self {
            Self::Sent => Some(0),
            Self::Delivered => Some(1),
            Self::Opened => Some(2),
            Self::Clicked => Some(3),
            Self::Failed => None,
        }
    }

    /// Moves along `SENT → DELIVERED → OPENED → CLICKED`, skipping steps is
    /// allowed. Anything short of clicked may still fail.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self.rank(), next.rank()) {
            (Some(current), Some(next)) => next > current,
            (Some(current), None) => current < 3,
            (None, _) => false,
        }
    }
}

impl Display for RecoveryAttemptStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryAttemptStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            "OPENED" => Ok(Self::Opened),
            "CLICKED" => Ok(Self::Clicked),
            "FAILED" => Ok(Self::Failed),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Outreach channel of a recovery attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryChannel {
    #[default]
    Email,
}

impl RecoveryChannel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
        }
    }
}

impl FromStr for RecoveryChannel {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Self::Email),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// One abandonment episode of a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct AbandonedCart {
    pub uuid: AbandonedCartUuid,
    pub tenant_uuid: TenantUuid,
    pub cart_uuid: CartUuid,
    pub customer_uuid: CustomerUuid,
    pub status: AbandonedCartStatus,

    /// Items as they were when the cart was abandoned.
    pub items: CartItems,
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

/// Audit record of one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAttempt {
    pub uuid: RecoveryAttemptUuid,
    pub tenant_uuid: TenantUuid,
    pub abandoned_cart_uuid: AbandonedCartUuid,
    pub channel: RecoveryChannel,
    pub attempt_number: u32,
    pub status: RecoveryAttemptStatus,
    pub template_name: String,
    pub discount_code: Option<String>,

    /// Reference assigned by the notification service.
    pub external_id: Option<String>,

    pub error_message: Option<String>,
    pub sent_at: Timestamp,
    pub delivered_at: Option<Timestamp>,
    pub opened_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// An abandoned cart together with its reminders.
#[derive(Debug, Clone, PartialEq)]
pub struct AbandonedCartDetails {
    pub cart: AbandonedCart,
    pub attempts: Vec<RecoveryAttempt>,
}

/// Kind of incentive offered in a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl FromStr for DiscountType {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED_AMOUNT" => Ok(Self::FixedAmount),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Per-tenant recovery configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedCartSettings {
    pub enabled: bool,

    /// Minutes without item changes before a cart counts as abandoned.
    pub abandonment_threshold_minutes: u32,

    /// Days after abandonment before an open episode expires.
    pub expiration_days: u32,

    /// Hours from detection to the first reminder.
    pub first_reminder_hours: u32,

    /// Hours from the first reminder to the second.
    pub second_reminder_hours: u32,

    /// Hours from the second reminder to the third, and any after it.
    pub third_reminder_hours: u32,

    pub max_reminders: u32,

    /// Reminder number that carries the discount code. Zero disables it.
    pub offer_discount_on_reminder: u32,

    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<u64>,
    pub discount_code: Option<String>,

    pub first_reminder_template: String,
    pub second_reminder_template: String,
    pub third_reminder_template: String,
}

impl Default for AbandonedCartSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            abandonment_threshold_minutes: 60,
            expiration_days: 30,
            first_reminder_hours: 1,
            second_reminder_hours: 24,
            third_reminder_hours: 72,
            max_reminders: 3,
            offer_discount_on_reminder: 2,
            discount_type: None,
            discount_value: None,
            discount_code: None,
            first_reminder_template: "abandoned_cart_reminder_1".to_string(),
            second_reminder_template: "abandoned_cart_reminder_2".to_string(),
            third_reminder_template: "abandoned_cart_reminder_3".to_string(),
        }
    }
}

impl AbandonedCartSettings {
    #[must_use]
    pub fn abandonment_threshold(&self) -> SignedDuration {
        SignedDuration::from_mins(i64::from(self.abandonment_threshold_minutes))
    }

    #[must_use]
    pub fn expiration(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.expiration_days) * 24)
    }

    #[must_use]
    pub fn first_reminder_delay(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.first_reminder_hours))
    }

    /// Template of the given 1-based reminder. The third template repeats.
    #[must_use]
    pub fn template_for(&self, reminder_number: u32) -> &str {
        match reminder_number {
            0 | 1 => &self.first_reminder_template,
            2 => &self.second_reminder_template,
            _ => &self.third_reminder_template,
        }
    }

    /// Wait after sending `reminder_number` before the next one, or `None`
    /// once the cap is reached.
    #[must_use]
    pub fn delay_after(&self, reminder_number: u32) -> Option<SignedDuration> {
        if reminder_number >= self.max_reminders {
            return None;
        }

        let hours = match reminder_number {
            0 => self.first_reminder_hours,
            1 => self.second_reminder_hours,
            _ => self.third_reminder_hours,
        };

        Some(SignedDuration::from_hours(i64::from(hours)))
    }

    /// Discount code to include in the given reminder, if any.
    #[must_use]
    pub fn discount_for(&self, reminder_number: u32) -> Option<&str> {
        if self.offer_discount_on_reminder == 0 || self.offer_discount_on_reminder != reminder_number
        {
            return None;
        }

        self.discount_code.as_deref().filter(|code| !code.is_empty())
    }
}

/// Columns `list` can order by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonedCartSort {
    #[default]
    AbandonedAt,
    Subtotal,
    ReminderCount,
}

impl AbandonedCartSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbandonedAt => "abandoned_at",
            Self::Subtotal => "subtotal",
            Self::ReminderCount => "reminder_count",
        }
    }
}

impl FromStr for AbandonedCartSort {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "abandoned_at" => Ok(Self::AbandonedAt),
            "subtotal" => Ok(Self::Subtotal),
            "reminder_count" => Ok(Self::ReminderCount),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Filters, paging and ordering for listing abandoned carts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbandonedCartFilter {
    pub customer: Option<CustomerUuid>,
    pub status: Option<AbandonedCartStatus>,
    pub abandoned_from: Option<Timestamp>,
    pub abandoned_to: Option<Timestamp>,
    pub min_value: Option<u64>,
    pub max_value: Option<u64>,

    /// 1-based page number.
    pub page: Option<u32>,
    pub limit: Option<u32>,

    pub sort: AbandonedCartSort,
    pub order: SortOrder,
}

impl AbandonedCartFilter {
    /// Requested page size, defaulted and clamped.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT)
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.filter(|page| *page > 0).unwrap_or(1)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

/// One page of abandoned carts.
#[derive(Debug, Clone, PartialEq)]
pub struct AbandonedCartPage {
    pub carts: Vec<AbandonedCart>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl AbandonedCartPage {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit.max(1)))
    }
}

/// Recovery figures for a tenant over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbandonedCartStats {
    pub total_abandoned: u64,
    pub total_recovered: u64,

    /// Recovered as a percentage of abandoned.
    pub recovery_rate: f64,

    pub total_abandoned_value: u64,
    pub total_recovered_value: u64,

    /// Episodes still open, regardless of period.
    pub pending_count: u64,
}

impl AbandonedCartStats {
    /// `recovered` as a percentage of `abandoned`, zero when nothing was
    /// abandoned.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "counts stay far below 2^52, a rate only needs two decimals"
    )]
    pub fn rate(recovered: u64, abandoned: u64) -> f64 {
        if abandoned == 0 {
            return 0.0;
        }

        recovered as f64 / abandoned as f64 * 100.0
    }
}

/// How an order closed an abandonment episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryDetails {
    pub order_id: String,
    pub source: Option<String>,
    pub discount_used: Option<String>,
    pub value: u64,
}
