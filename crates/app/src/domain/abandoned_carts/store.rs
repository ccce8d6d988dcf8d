//! Abandoned cart persistence.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::warn;

use crate::{
    database::Db,
    domain::{
        abandoned_carts::{
            data::{NewAbandonedCart, NewRecoveryAttempt, ReminderClaim},
            errors::AbandonedCartsServiceError,
            models::{
                AbandonedCart, AbandonedCartDetails, AbandonedCartFilter, AbandonedCartPage,
                AbandonedCartSettings, AbandonedCartStats, AbandonedCartUuid, RecoveryAttempt,
                RecoveryAttemptStatus, RecoveryAttemptUuid, RecoveryDetails,
            },
            records::AbandonedCartRecord,
            repository::PgAbandonedCartsRepository,
        },
        carts::models::CartUuid,
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgAbandonedCartStore {
    db: Db,
    repository: PgAbandonedCartsRepository,
}

impl PgAbandonedCartStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAbandonedCartsRepository::new(),
        }
    }
}

/// Decode a page of rows, skipping any whose snapshot or status cannot be
/// read so one corrupt row does not block the rest.
fn decode_all(records: Vec<AbandonedCartRecord>) -> Vec<AbandonedCart> {
    records
        .into_iter()
        .filter_map(|record| {
            let uuid = record.uuid;

            match AbandonedCart::try_from(record) {
                Ok(cart) => Some(cart),
                Err(error) => {
                    warn!(abandoned_cart = %uuid, %error, "skipping unreadable abandoned cart");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl AbandonedCartStore for PgAbandonedCartStore {
    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.repository.get_settings(&mut tx, tenant).await?;

        tx.commit().await?;

        record.map_or_else(|| Ok(AbandonedCartSettings::default()), TryInto::try_into)
    }

    async fn upsert_settings(
        &self,
        tenant: TenantUuid,
        settings: AbandonedCartSettings,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .upsert_settings(&mut tx, tenant, &settings)
            .await?;

        tx.commit().await?;

        record.try_into()
    }

    async fn find_open_carts(
        &self,
        tenant: TenantUuid,
        carts: &[CartUuid],
    ) -> Result<Vec<CartUuid>, AbandonedCartsServiceError> {
        if carts.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin().await?;

        let open = self.repository.find_open_carts(&mut tx, tenant, carts).await?;

        tx.commit().await?;

        Ok(open)
    }

    async fn create(
        &self,
        tenant: TenantUuid,
        new: NewAbandonedCart,
    ) -> Result<Option<AbandonedCart>, AbandonedCartsServiceError> {
        let items = new.items.to_document()?;

        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .insert_abandoned_cart(&mut tx, tenant, &new, &items)
            .await?;

        tx.commit().await?;

        record.map(TryInto::try_into).transpose()
    }

    async fn list_due(
        &self,
        tenant: TenantUuid,
        now: Timestamp,
        max_reminders: u32,
        limit: u32,
    ) -> Result<Vec<AbandonedCart>, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .list_due_reminders(&mut tx, tenant, now, max_reminders, limit)
            .await?;

        tx.commit().await?;

        Ok(decode_all(records))
    }

    async fn list_open(
        &self,
        tenant: TenantUuid,
        abandoned_carts: &[AbandonedCartUuid],
    ) -> Result<Vec<AbandonedCart>, AbandonedCartsServiceError> {
        if abandoned_carts.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .list_open_abandoned_carts(&mut tx, tenant, abandoned_carts)
            .await?;

        tx.commit().await?;

        Ok(decode_all(records))
    }

    async fn claim_reminder(
        &self,
        tenant: TenantUuid,
        claim: ReminderClaim,
    ) -> Result<Option<AbandonedCart>, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.repository.claim_reminder(&mut tx, tenant, &claim).await?;

        tx.commit().await?;

        record.map(TryInto::try_into).transpose()
    }

    async fn record_attempt(
        &self,
        tenant: TenantUuid,
        attempt: NewRecoveryAttempt,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .insert_recovery_attempt(&mut tx, tenant, &attempt)
            .await?;

        tx.commit().await?;

        record.try_into()
    }

    async fn mark_recovered(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        details: RecoveryDetails,
        now: Timestamp,
    ) -> Result<bool, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .mark_recovered(&mut tx, tenant, cart, &details, now)
            .await?;

        tx.commit().await?;

        Ok(rows_affected > 0)
    }

    async fn expire(
        &self,
        tenant: TenantUuid,
        abandoned_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let expired = self
            .repository
            .expire_abandoned_carts(&mut tx, tenant, abandoned_before, now)
            .await?;

        tx.commit().await?;

        Ok(expired)
    }

    async fn list(
        &self,
        tenant: TenantUuid,
        filter: AbandonedCartFilter,
    ) -> Result<AbandonedCartPage, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .repository
            .list_abandoned_carts(&mut tx, tenant, &filter)
            .await?;

        let total = self
            .repository
            .count_abandoned_carts(&mut tx, tenant, &filter)
            .await?;

        tx.commit().await?;

        Ok(AbandonedCartPage {
            carts: decode_all(records),
            total,
            page: filter.page(),
            limit: filter.limit(),
        })
    }

    async fn get(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<AbandonedCartDetails, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .repository
            .get_abandoned_cart(&mut tx, tenant, abandoned_cart)
            .await?;

        let attempts = self
            .repository
            .list_recovery_attempts(&mut tx, tenant, abandoned_cart)
            .await?;

        tx.commit().await?;

        Ok(AbandonedCartDetails {
            cart: record.try_into()?,
            attempts: attempts
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn stats(
        &self,
        tenant: TenantUuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<AbandonedCartStats, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let stats = self.repository.stats(&mut tx, tenant, from, to).await?;

        tx.commit().await?;

        Ok(stats)
    }

    async fn delete(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<(), AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .delete_abandoned_cart(&mut tx, tenant, abandoned_cart)
            .await?;

        if rows_affected == 0 {
            return Err(AbandonedCartsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn update_attempt_status(
        &self,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
        status: RecoveryAttemptStatus,
        error_message: Option<String>,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError> {
        let mut tx = self.db.begin().await?;

        let current: RecoveryAttempt = self
            .repository
            .get_recovery_attempt(&mut tx, tenant, attempt)
            .await?
            .try_into()?;

        if !current.status.can_transition_to(status) {
            return Err(AbandonedCartsServiceError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        let record = self
            .repository
            .update_recovery_attempt_status(
                &mut tx,
                tenant,
                attempt,
                status,
                Timestamp::now(),
                error_message.as_deref(),
            )
            .await?;

        tx.commit().await?;

        record.try_into()
    }
}

#[automock]
#[async_trait]
pub trait AbandonedCartStore: Send + Sync {
    /// A tenant's recovery settings, or the defaults when none were saved.
    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError>;

    async fn upsert_settings(
        &self,
        tenant: TenantUuid,
        settings: AbandonedCartSettings,
    ) -> Result<AbandonedCartSettings, AbandonedCartsServiceError>;

    /// The subset of `carts` that already have an open abandoned cart.
    async fn find_open_carts(
        &self,
        tenant: TenantUuid,
        carts: &[CartUuid],
    ) -> Result<Vec<CartUuid>, AbandonedCartsServiceError>;

    /// Record a pending abandoned cart. Returns `None` when the source cart
    /// already has an open one.
    async fn create(
        &self,
        tenant: TenantUuid,
        new: NewAbandonedCart,
    ) -> Result<Option<AbandonedCart>, AbandonedCartsServiceError>;

    /// Open abandoned carts whose next reminder is due and that have had
    /// fewer than `max_reminders`, earliest first.
    async fn list_due(
        &self,
        tenant: TenantUuid,
        now: Timestamp,
        max_reminders: u32,
        limit: u32,
    ) -> Result<Vec<AbandonedCart>, AbandonedCartsServiceError>;

    /// The open abandoned carts among `abandoned_carts`.
    async fn list_open(
        &self,
        tenant: TenantUuid,
        abandoned_carts: &[AbandonedCartUuid],
    ) -> Result<Vec<AbandonedCart>, AbandonedCartsServiceError>;

    /// Advance an open abandoned cart past one more reminder if its count is
    /// still `claim.expected_count`.
    async fn claim_reminder(
        &self,
        tenant: TenantUuid,
        claim: ReminderClaim,
    ) -> Result<Option<AbandonedCart>, AbandonedCartsServiceError>;

    async fn record_attempt(
        &self,
        tenant: TenantUuid,
        attempt: NewRecoveryAttempt,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError>;

    /// Close the open abandoned cart of `cart` as recovered. Returns `false`
    /// when there was none.
    async fn mark_recovered(
        &self,
        tenant: TenantUuid,
        cart: CartUuid,
        details: RecoveryDetails,
        now: Timestamp,
    ) -> Result<bool, AbandonedCartsServiceError>;

    /// Expire every open abandoned cart abandoned before `abandoned_before`.
    async fn expire(
        &self,
        tenant: TenantUuid,
        abandoned_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, AbandonedCartsServiceError>;

    async fn list(
        &self,
        tenant: TenantUuid,
        filter: AbandonedCartFilter,
    ) -> Result<AbandonedCartPage, AbandonedCartsServiceError>;

    async fn get(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<AbandonedCartDetails, AbandonedCartsServiceError>;

    async fn stats(
        &self,
        tenant: TenantUuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<AbandonedCartStats, AbandonedCartsServiceError>;

    async fn delete(
        &self,
        tenant: TenantUuid,
        abandoned_cart: AbandonedCartUuid,
    ) -> Result<(), AbandonedCartsServiceError>;

    /// Move an attempt along its delivery lifecycle, stamping the matching
    /// timestamp.
    async fn update_attempt_status(
        &self,
        tenant: TenantUuid,
        attempt: RecoveryAttemptUuid,
        status: RecoveryAttemptStatus,
        error_message: Option<String>,
    ) -> Result<RecoveryAttempt, AbandonedCartsServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use sqlx::query;
    use testresult::TestResult;

    use crate::{
        domain::{
            abandoned_carts::models::{
                AbandonedCartSort, AbandonedCartStatus, RecoveryChannel, SortOrder,
            },
            carts::{data::NewCartItem, models::CartItems},
            customers::records::CustomerUuid,
        },
        test::TestContext,
    };

    use super::*;

    fn snapshot(subtotal: u64, abandoned_at: Timestamp) -> NewAbandonedCart {
        let items: CartItems = [NewCartItem::test_item("mug", subtotal, 1)]
            .into_iter()
            .map(|item| item.into_item(abandoned_at))
            .collect();

        NewAbandonedCart {
            cart_uuid: CartUuid::new(),
            customer_uuid: CustomerUuid::new(),
            items,
            subtotal,
            item_count: 1,
            customer_email: "shopper@example.com".to_string(),
            customer_first_name: Some("Sam".to_string()),
            customer_last_name: None,
            abandoned_at,
            last_cart_activity: abandoned_at,
            next_reminder_at: Some(abandoned_at + SignedDuration::from_hours(1)),
        }
    }

    fn days_ago(days: i64) -> Timestamp {
        Timestamp::now() - SignedDuration::from_hours(days * 24)
    }

    #[tokio::test]
    async fn settings_default_until_saved() -> TestResult {
        let ctx = TestContext::new().await;

        let settings = ctx.abandoned_store.get_settings(ctx.tenant_uuid).await?;

        assert_eq!(settings, AbandonedCartSettings::default());

        let saved = ctx
            .abandoned_store
            .upsert_settings(
                ctx.tenant_uuid,
                AbandonedCartSettings {
                    max_reminders: 5,
                    discount_code: Some("COMEBACK".to_string()),
                    ..settings
                },
            )
            .await?;

        let reloaded = ctx.abandoned_store.get_settings(ctx.tenant_uuid).await?;

        assert_eq!(reloaded, saved);
        assert_eq!(reloaded.max_reminders, 5);

        Ok(())
    }

    #[tokio::test]
    async fn create_keeps_one_open_record_per_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let new = snapshot(2_500, Timestamp::now());
        let cart = new.cart_uuid;

        let first = ctx.abandoned_store.create(ctx.tenant_uuid, new.clone()).await?;
        let second = ctx.abandoned_store.create(ctx.tenant_uuid, new).await?;

        let first = first.ok_or("expected the first record to be created")?;

        assert_eq!(first.status, AbandonedCartStatus::Pending);
        assert_eq!(first.items.len(), 1);
        assert!(second.is_none(), "second open record must be refused");

        let open = ctx
            .abandoned_store
            .find_open_carts(ctx.tenant_uuid, &[cart, CartUuid::new()])
            .await?;

        assert_eq!(open, vec![cart]);

        Ok(())
    }

    #[tokio::test]
    async fn closed_record_allows_a_new_episode() -> TestResult {
        let ctx = TestContext::new().await;
        let new = snapshot(2_500, Timestamp::now());

        ctx.abandoned_store.create(ctx.tenant_uuid, new.clone()).await?;

        let recovered = ctx
            .abandoned_store
            .mark_recovered(
                ctx.tenant_uuid,
                new.cart_uuid,
                RecoveryDetails {
                    order_id: "order-1".to_string(),
                    value: 2_500,
                    ..RecoveryDetails::default()
                },
                Timestamp::now(),
            )
            .await?;

        assert!(recovered, "open record should be recovered");

        let again = ctx.abandoned_store.create(ctx.tenant_uuid, new).await?;

        assert!(again.is_some(), "a recovered cart can be abandoned again");

        Ok(())
    }

    #[tokio::test]
    async fn expire_sweeps_only_old_open_records() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let old = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, days_ago(31)))
            .await?
            .ok_or("old record")?;
        let fresh = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, days_ago(29)))
            .await?
            .ok_or("fresh record")?;

        let expired = ctx
            .abandoned_store
            .expire(ctx.tenant_uuid, now - SignedDuration::from_hours(30 * 24), now)
            .await?;

        assert_eq!(expired, 1);

        let old = ctx.abandoned_store.get(ctx.tenant_uuid, old.uuid).await?.cart;
        let fresh = ctx.abandoned_store.get(ctx.tenant_uuid, fresh.uuid).await?.cart;

        assert_eq!(old.status, AbandonedCartStatus::Expired);
        assert!(old.expired_at.is_some(), "expiry is stamped");
        assert!(old.next_reminder_at.is_none(), "no more reminders");
        assert_eq!(fresh.status, AbandonedCartStatus::Pending);

        Ok(())
    }

    #[tokio::test]
    async fn recovering_an_expired_record_is_a_no_op() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();
        let new = snapshot(1_000, days_ago(40));
        let cart = new.cart_uuid;

        let record = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, new)
            .await?
            .ok_or("record")?;

        ctx.abandoned_store
            .expire(ctx.tenant_uuid, now - SignedDuration::from_hours(30 * 24), now)
            .await?;

        let recovered = ctx
            .abandoned_store
            .mark_recovered(
                ctx.tenant_uuid,
                cart,
                RecoveryDetails {
                    order_id: "late-order".to_string(),
                    value: 1_000,
                    ..RecoveryDetails::default()
                },
                now,
            )
            .await?;

        let stored = ctx.abandoned_store.get(ctx.tenant_uuid, record.uuid).await?.cart;

        assert!(!recovered, "terminal records are left alone");
        assert_eq!(stored.status, AbandonedCartStatus::Expired);
        assert!(stored.recovered_order_id.is_none(), "order is not stamped");

        Ok(())
    }

    #[tokio::test]
    async fn claim_reminder_is_compare_and_swap() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let record = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, now))
            .await?
            .ok_or("record")?;

        let claim = ReminderClaim {
            abandoned_cart_uuid: record.uuid,
            expected_count: 0,
            sent_at: now,
            next_reminder_at: Some(now + SignedDuration::from_hours(24)),
        };

        let claimed = ctx
            .abandoned_store
            .claim_reminder(ctx.tenant_uuid, claim)
            .await?
            .ok_or("first claim should win")?;

        let lost = ctx.abandoned_store.claim_reminder(ctx.tenant_uuid, claim).await?;

        assert_eq!(claimed.reminder_count, 1);
        assert_eq!(claimed.status, AbandonedCartStatus::Reminded);
        assert!(claimed.last_reminder_at.is_some(), "send time is stamped");
        assert!(lost.is_none(), "stale count must not claim again");

        Ok(())
    }

    #[tokio::test]
    async fn lists_due_records_only() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let due = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, now - SignedDuration::from_hours(2)))
            .await?
            .ok_or("due record")?;

        let mut later = snapshot(1_000, now);
        later.next_reminder_at = Some(now + SignedDuration::from_hours(5));

        ctx.abandoned_store.create(ctx.tenant_uuid, later).await?;

        let listed = ctx.abandoned_store.list_due(ctx.tenant_uuid, now, 3, 10).await?;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uuid, due.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn capped_records_do_not_crowd_out_due_ones() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        for _ in 0..3 {
            let capped = ctx
                .abandoned_store
                .create(ctx.tenant_uuid, snapshot(1_000, now - SignedDuration::from_hours(10)))
                .await?
                .ok_or("capped record")?;

            query("UPDATE abandoned_carts SET reminder_count = 3, status = 'REMINDED' WHERE uuid = $1")
                .bind(capped.uuid.into_uuid())
                .execute(ctx.db.pool())
                .await?;
        }

        let due = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, now - SignedDuration::from_hours(2)))
            .await?
            .ok_or("due record")?;

        let listed = ctx.abandoned_store.list_due(ctx.tenant_uuid, now, 2, 3).await?;

        assert_eq!(listed.len(), 1, "capped records must not be listed");
        assert_eq!(listed[0].uuid, due.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() -> TestResult {
        let ctx = TestContext::new().await;

        for subtotal in [500, 1_500, 2_500, 3_500] {
            ctx.abandoned_store
                .create(ctx.tenant_uuid, snapshot(subtotal, Timestamp::now()))
                .await?;
        }

        ctx.abandoned_store
            .create(TenantUuid::new(), snapshot(9_999, Timestamp::now()))
            .await?;

        let page = ctx
            .abandoned_store
            .list(
                ctx.tenant_uuid,
                AbandonedCartFilter {
                    min_value: Some(1_000),
                    limit: Some(2),
                    sort: AbandonedCartSort::Subtotal,
                    order: SortOrder::Asc,
                    ..AbandonedCartFilter::default()
                },
            )
            .await?;

        let subtotals: Vec<u64> = page.carts.iter().map(|cart| cart.subtotal).collect();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(subtotals, vec![1_500, 2_500]);

        Ok(())
    }

    #[tokio::test]
    async fn stats_summarise_recovery() -> TestResult {
        let ctx = TestContext::new().await;
        let recovered = snapshot(4_000, Timestamp::now());

        ctx.abandoned_store
            .create(ctx.tenant_uuid, recovered.clone())
            .await?;
        ctx.abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, Timestamp::now()))
            .await?;

        ctx.abandoned_store
            .mark_recovered(
                ctx.tenant_uuid,
                recovered.cart_uuid,
                RecoveryDetails {
                    order_id: "order-9".to_string(),
                    source: Some("email".to_string()),
                    discount_used: None,
                    value: 3_800,
                },
                Timestamp::now(),
            )
            .await?;

        let stats = ctx.abandoned_store.stats(ctx.tenant_uuid, None, None).await?;

        assert_eq!(stats.total_abandoned, 2);
        assert_eq!(stats.total_recovered, 1);
        assert!((stats.recovery_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_abandoned_value, 5_000);
        assert_eq!(stats.total_recovered_value, 3_800);
        assert_eq!(stats.pending_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn attempt_status_only_moves_forward() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let record = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, now))
            .await?
            .ok_or("record")?;

        let attempt = ctx
            .abandoned_store
            .record_attempt(
                ctx.tenant_uuid,
                NewRecoveryAttempt {
                    abandoned_cart_uuid: record.uuid,
                    channel: RecoveryChannel::Email,
                    attempt_number: 1,
                    status: RecoveryAttemptStatus::Sent,
                    template_name: "abandoned_cart_reminder_1".to_string(),
                    discount_code: None,
                    external_id: Some("msg-1".to_string()),
                    error_message: None,
                    sent_at: now,
                },
            )
            .await?;

        let opened = ctx
            .abandoned_store
            .update_attempt_status(ctx.tenant_uuid, attempt.uuid, RecoveryAttemptStatus::Opened, None)
            .await?;

        assert_eq!(opened.status, RecoveryAttemptStatus::Opened);
        assert!(opened.opened_at.is_some(), "opened time is stamped");

        let result = ctx
            .abandoned_store
            .update_attempt_status(
                ctx.tenant_uuid,
                attempt.uuid,
                RecoveryAttemptStatus::Delivered,
                None,
            )
            .await;

        assert!(
            matches!(result, Err(AbandonedCartsServiceError::InvalidTransition { .. })),
            "expected InvalidTransition, got {result:?}"
        );

        let details = ctx.abandoned_store.get(ctx.tenant_uuid, record.uuid).await?;

        assert_eq!(details.attempts.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_record_and_attempts() -> TestResult {
        let ctx = TestContext::new().await;

        let record = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, Timestamp::now()))
            .await?
            .ok_or("record")?;

        ctx.abandoned_store.delete(ctx.tenant_uuid, record.uuid).await?;

        let result = ctx.abandoned_store.get(ctx.tenant_uuid, record.uuid).await;

        assert!(
            matches!(result, Err(AbandonedCartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        let again = ctx.abandoned_store.delete(ctx.tenant_uuid, record.uuid).await;

        assert!(
            matches!(again, Err(AbandonedCartsServiceError::NotFound)),
            "expected NotFound, got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_skipped_in_lists() -> TestResult {
        let ctx = TestContext::new().await;

        let record = ctx
            .abandoned_store
            .create(ctx.tenant_uuid, snapshot(1_000, Timestamp::now()))
            .await?
            .ok_or("record")?;

        ctx.abandoned_store
            .create(ctx.tenant_uuid, snapshot(2_000, Timestamp::now()))
            .await?;

        query("UPDATE abandoned_carts SET items = '{\"version\": 99}'::jsonb WHERE uuid = $1")
            .bind(record.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let page = ctx
            .abandoned_store
            .list(ctx.tenant_uuid, AbandonedCartFilter::default())
            .await?;

        assert_eq!(page.total, 2);
        assert_eq!(page.carts.len(), 1, "unreadable row is skipped");

        Ok(())
    }
}
