//! Abandoned Carts Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    database::{
        amount_param, count_param, try_get_amount, try_get_count, try_get_optional_amount,
    },
    domain::{
        abandoned_carts::{
            data::{NewAbandonedCart, NewRecoveryAttempt, ReminderClaim},
            models::{
                AbandonedCartFilter, AbandonedCartSettings, AbandonedCartStats,
                AbandonedCartUuid, RecoveryAttemptStatus, RecoveryAttemptUuid, RecoveryDetails,
            },
            records::{AbandonedCartRecord, RecoveryAttemptRecord, SettingsRecord},
        },
        carts::models::CartUuid,
        customers::records::CustomerUuid,
        tenants::records::TenantUuid,
    },
};

const GET_SETTINGS_SQL: &str = include_str!("sql/get_settings.sql");
const UPSERT_SETTINGS_SQL: &str = include_str!("sql/upsert_settings.sql");
const FIND_OPEN_CARTS_SQL: &str = include_str!("sql/find_open_carts.sql");
const INSERT_ABANDONED_CART_SQL: &str = include_str!("sql/insert_abandoned_cart.sql");
const LIST_DUE_REMINDERS_SQL: &str = include_str!("sql/list_due_reminders.sql");
const LIST_OPEN_ABANDONED_CARTS_SQL: &str = include_str!("sql/list_open_abandoned_carts.sql");
const CLAIM_REMINDER_SQL: &str = include_str!("sql/claim_reminder.sql");
const INSERT_RECOVERY_ATTEMPT_SQL: &str = include_str!("sql/insert_recovery_attempt.sql");
const MARK_RECOVERED_SQL: &str = include_str!("sql/mark_recovered.sql");
const EXPIRE_ABANDONED_CARTS_SQL: &str = include_str!("sql/expire_abandoned_carts.sql");
const LIST_ABANDONED_CARTS_SQL: &str = include_str!("sql/list_abandoned_carts.sql");
const COUNT_ABANDONED_CARTS_SQL: &str = include_str!("sql/count_abandoned_carts.sql");
const GET_ABANDONED_CART_SQL: &str = include_str!("sql/get_abandoned_cart.sql");
const LIST_RECOVERY_ATTEMPTS_SQL: &str = include_str!("sql/list_recovery_attempts.sql");
const ABANDONED_CART_STATS_SQL: &str = include_str!("sql/abandoned_cart_stats.sql");
const DELETE_ABANDONED_CART_SQL: &str = include_str!("sql/delete_abandoned_cart.sql");
const GET_RECOVERY_ATTEMPT_SQL: &str = include_str!("sql/get_recovery_attempt.sql");
const UPDATE_RECOVERY_ATTEMPT_STATUS_SQL: &str =
    include_str!("sql/update_recovery_attempt_status.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgAbandonedCartsRepository;

impl PgAbandonedCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
    ) -> Result<Option<SettingsRecord>, sqlx::Error> {
        query_as::<Postgres, SettingsRecord>(GET_SETTINGS_SQL)
            .bind(tenant.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn upsert_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        settings: &AbandonedCartSettings,
    ) -> Result<SettingsRecord, sqlx::Error> {
        query_as::<Postgres, SettingsRecord>(UPSERT_SETTINGS_SQL)
            .bind(tenant.into_uuid())
            .bind(settings.enabled)
            .bind(count_param(settings.abandonment_threshold_minutes)?)
            .bind(count_param(settings.expiration_days)?)
            .bind(count_param(settings.first_reminder_hours)?)
            .bind(count_param(settings.second_reminder_hours)?)
            .bind(count_param(settings.third_reminder_hours)?)
            .bind(count_param(settings.max_reminders)?)
            .bind(count_param(settings.offer_discount_on_reminder)?)
            .bind(settings.discount_type.map(|kind| kind.as_str()))
            .bind(settings.discount_value.map(amount_param).transpose()?)
            .bind(settings.discount_code.as_deref())
            .bind(&settings.first_reminder_template)
            .bind(&settings.second_reminder_template)
            .bind(&settings.third_reminder_template)
            .fetch_one(&mut **tx)
            .await
    }

    /// Which of `carts` already have an open abandoned cart.
    pub(crate) async fn find_open_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        carts: &[CartUuid],
    ) -> Result<Vec<CartUuid>, sqlx::Error> {
        let uuids: Vec<Uuid> = carts.iter().copied().map(CartUuid::into_uuid).collect();

        let open: Vec<Uuid> = query_scalar(FIND_OPEN_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await?;

        Ok(open.into_iter().map(CartUuid::from_uuid).collect())
    }

    /// Insert a pending abandoned cart. Returns `None` when the cart already
    /// has an open one.
    pub(crate) async fn insert_abandoned_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        new: &NewAbandonedCart,
        items: &serde_json::Value,
    ) -> Result<Option<AbandonedCartRecord>, sqlx::Error> {
        query_as::<Postgres, AbandonedCartRecord>(INSERT_ABANDONED_CART_SQL)
            .bind(AbandonedCartUuid::new().into_uuid())
            .bind(tenant.into_uuid())
            .bind(new.cart_uuid.into_uuid())
            .bind(new.customer_uuid.into_uuid())
            .bind(items)
            .bind(amount_param(new.subtotal)?)
            .bind(amount_param(new.item_count)?)
            .bind(&new.customer_email)
            .bind(new.customer_first_name.as_deref())
            .bind(new.customer_last_name.as_deref())
            .bind(SqlxTimestamp::from(new.abandoned_at))
            .bind(SqlxTimestamp::from(new.last_cart_activity))
            .bind(new.next_reminder_at.map(SqlxTimestamp::from))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_due_reminders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        now: Timestamp,
        max_reminders: u32,
        limit: u32,
    ) -> Result<Vec<AbandonedCartRecord>, sqlx::Error> {
        query_as::<Postgres, AbandonedCartRecord>(LIST_DUE_REMINDERS_SQL)
            .bind(tenant.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .bind(count_param(max_reminders)?)
            .bind(i64::from(limit))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_open_abandoned_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        abandoned_carts: &[AbandonedCartUuid],
    ) -> Result<Vec<AbandonedCartRecord>, sqlx::Error> {
        let uuids: Vec<Uuid> = abandoned_carts
            .iter()
            .copied()
            .map(AbandonedCartUuid::into_uuid)
            .collect();

        query_as::<Postgres, AbandonedCartRecord>(LIST_OPEN_ABANDONED_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await
    }

    /// Compare-and-swap on the reminder count. Returns `None` when another
    /// sender advanced the record first or it is no longer open.
    pub(crate) async fn claim_reminder(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        claim: &ReminderClaim,
    ) -> Result<Option<AbandonedCartRecord>, sqlx::Error> {
        query_as::<Postgres, AbandonedCartRecord>(CLAIM_REMINDER_SQL)
            .bind(tenant.into_uuid())
            .bind(claim.abandoned_cart_uuid.into_uuid())
            .bind(count_param(claim.expected_count)?)
            .bind(SqlxTimestamp::from(claim.sent_at))
            .bind(claim.next_reminder_at.map(SqlxTimestamp::from))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn insert_recovery_attempt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        attempt: &NewRecoveryAttempt,
    ) -> Result<RecoveryAttemptRecord, sqlx::Error> {
        query_as::<Postgres, RecoveryAttemptRecord>(INSERT_RECOVERY_ATTEMPT_SQL)
            .bind(RecoveryAttemptUuid::new().into_uuid())
            .bind(tenant.into_uuid())
            .bind(attempt.abandoned_cart_uuid.into_uuid())
            .bind(attempt.channel.as_str())
            .bind(count_param(attempt.attempt_number)?)
            .bind(attempt.status.as_str())
            .bind(&attempt.template_name)
            .bind(attempt.discount_code.as_deref())
            .bind(attempt.external_id.as_deref())
            .bind(attempt.error_message.as_deref())
            .bind(SqlxTimestamp::from(attempt.sent_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn mark_recovered(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        cart: CartUuid,
        details: &RecoveryDetails,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_RECOVERED_SQL)
            .bind(tenant.into_uuid())
            .bind(cart.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .bind(&details.order_id)
            .bind(details.source.as_deref())
            .bind(details.discount_used.as_deref())
            .bind(amount_param(details.value)?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn expire_abandoned_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        abandoned_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(EXPIRE_ABANDONED_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(SqlxTimestamp::from(abandoned_before))
            .bind(SqlxTimestamp::from(now))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_abandoned_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        filter: &AbandonedCartFilter,
    ) -> Result<Vec<AbandonedCartRecord>, sqlx::Error> {
        let offset = i64::try_from(filter.offset()).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        query_as::<Postgres, AbandonedCartRecord>(LIST_ABANDONED_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(filter.customer.map(CustomerUuid::into_uuid))
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.abandoned_from.map(SqlxTimestamp::from))
            .bind(filter.abandoned_to.map(SqlxTimestamp::from))
            .bind(filter.min_value.map(amount_param).transpose()?)
            .bind(filter.max_value.map(amount_param).transpose()?)
            .bind(filter.sort.as_str())
            .bind(filter.order.as_str())
            .bind(i64::from(filter.limit()))
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_abandoned_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        filter: &AbandonedCartFilter,
    ) -> Result<u64, sqlx::Error> {
        let row = query(COUNT_ABANDONED_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(filter.customer.map(CustomerUuid::into_uuid))
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.abandoned_from.map(SqlxTimestamp::from))
            .bind(filter.abandoned_to.map(SqlxTimestamp::from))
            .bind(filter.min_value.map(amount_param).transpose()?)
            .bind(filter.max_value.map(amount_param).transpose()?)
            .fetch_one(&mut **tx)
            .await?;

        try_get_amount(&row, "total")
    }

    pub(crate) async fn get_abandoned_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<AbandonedCartRecord, sqlx::Error> {
        query_as::<Postgres, AbandonedCartRecord>(GET_ABANDONED_CART_SQL)
            .bind(tenant.into_uuid())
            .bind(abandoned_cart.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_recovery_attempts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<Vec<RecoveryAttemptRecord>, sqlx::Error> {
        query_as::<Postgres, RecoveryAttemptRecord>(LIST_RECOVERY_ATTEMPTS_SQL)
            .bind(tenant.into_uuid())
            .bind(abandoned_cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn stats(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<AbandonedCartStats, sqlx::Error> {
        query_as::<Postgres, AbandonedCartStats>(ABANDONED_CART_STATS_SQL)
            .bind(tenant.into_uuid())
            .bind(from.map(SqlxTimestamp::from))
            .bind(to.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_abandoned_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_ABANDONED_CART_SQL)
            .bind(tenant.into_uuid())
            .bind(abandoned_cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Load an attempt and lock it for a status update.
    pub(crate) async fn get_recovery_attempt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
    ) -> Result<RecoveryAttemptRecord, sqlx::Error> {
        query_as::<Postgres, RecoveryAttemptRecord>(GET_RECOVERY_ATTEMPT_SQL)
            .bind(tenant.into_uuid())
            .bind(attempt.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_recovery_attempt_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
        status: RecoveryAttemptStatus,
        now: Timestamp,
        error_message: Option<&str>,
    ) -> Result<RecoveryAttemptRecord, sqlx::Error> {
        query_as::<Postgres, RecoveryAttemptRecord>(UPDATE_RECOVERY_ATTEMPT_STATUS_SQL)
            .bind(tenant.into_uuid())
            .bind(attempt.into_uuid())
            .bind(status.as_str())
            .bind(SqlxTimestamp::from(now))
            .bind(error_message)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for AbandonedCartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AbandonedCartUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            status: row.try_get("status")?,
            items: row.try_get("items")?,
            subtotal: try_get_amount(row, "subtotal")?,
            item_count: try_get_amount(row, "item_count")?,
            customer_email: row.try_get("customer_email")?,
            customer_first_name: row.try_get("customer_first_name")?,
            customer_last_name: row.try_get("customer_last_name")?,
            abandoned_at: row.try_get::<SqlxTimestamp, _>("abandoned_at")?.to_jiff(),
            last_cart_activity: row
                .try_get::<SqlxTimestamp, _>("last_cart_activity")?
                .to_jiff(),
            reminder_count: try_get_count(row, "reminder_count")?,
            last_reminder_at: try_get_optional_timestamp(row, "last_reminder_at")?,
            next_reminder_at: try_get_optional_timestamp(row, "next_reminder_at")?,
            recovered_at: try_get_optional_timestamp(row, "recovered_at")?,
            recovered_order_id: row.try_get("recovered_order_id")?,
            recovery_source: row.try_get("recovery_source")?,
            discount_used: row.try_get("discount_used")?,
            recovered_value: try_get_optional_amount(row, "recovered_value")?,
            expired_at: try_get_optional_timestamp(row, "expired_at")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for RecoveryAttemptRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: RecoveryAttemptUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            abandoned_cart_uuid: AbandonedCartUuid::from_uuid(row.try_get("abandoned_cart_uuid")?),
            channel: row.try_get("channel")?,
            attempt_number: try_get_count(row, "attempt_number")?,
            status: row.try_get("status")?,
            template_name: row.try_get("template_name")?,
            discount_code: row.try_get("discount_code")?,
            external_id: row.try_get("external_id")?,
            error_message: row.try_get("error_message")?,
            sent_at: row.try_get::<SqlxTimestamp, _>("sent_at")?.to_jiff(),
            delivered_at: try_get_optional_timestamp(row, "delivered_at")?,
            opened_at: try_get_optional_timestamp(row, "opened_at")?,
            clicked_at: try_get_optional_timestamp(row, "clicked_at")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for SettingsRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            enabled: row.try_get("enabled")?,
            abandonment_threshold_minutes: try_get_count(row, "abandonment_threshold_minutes")?,
            expiration_days: try_get_count(row, "expiration_days")?,
            first_reminder_hours: try_get_count(row, "first_reminder_hours")?,
            second_reminder_hours: try_get_count(row, "second_reminder_hours")?,
            third_reminder_hours: try_get_count(row, "third_reminder_hours")?,
            max_reminders: try_get_count(row, "max_reminders")?,
            offer_discount_on_reminder: try_get_count(row, "offer_discount_on_reminder")?,
            discount_type: row.try_get("discount_type")?,
            discount_value: try_get_optional_amount(row, "discount_value")?,
            discount_code: row.try_get("discount_code")?,
            first_reminder_template: row.try_get("first_reminder_template")?,
            second_reminder_template: row.try_get("second_reminder_template")?,
            third_reminder_template: row.try_get("third_reminder_template")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AbandonedCartStats {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let total_abandoned = try_get_amount(row, "total_abandoned")?;
        let total_recovered = try_get_amount(row, "total_recovered")?;

        Ok(Self {
            total_abandoned,
            total_recovered,
            recovery_rate: AbandonedCartStats::rate(total_recovered, total_abandoned),
            total_abandoned_value: try_get_amount(row, "total_abandoned_value")?,
            total_recovered_value: try_get_amount(row, "total_recovered_value")?,
            pending_count: try_get_amount(row, "pending_count")?,
        })
    }
}

fn try_get_optional_timestamp(row: &PgRow, col: &str) -> Result<Option<Timestamp>, sqlx::Error> {
    Ok(row
        .try_get::<Option<SqlxTimestamp>, _>(col)?
        .map(SqlxTimestamp::to_jiff))
}
