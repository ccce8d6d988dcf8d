//! Expiration worker.
//!
//! Each pass deletes carts past their expiry in one statement, then pages
//! through the remaining carts and drops lines that were added too long ago.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    domain::carts::{
        CartsService,
        models::{CART_LIFETIME_DAYS, Cart},
    },
    workers::{
        errors::WorkerError,
        runner::{Pass, Runner, Schedule, WorkerStatus, cutoff},
    },
};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationConfig {
    pub interval: Duration,

    /// Lines added longer ago than this are pruned.
    pub item_max_age: Duration,

    pub page_size: u32,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            item_max_age: Duration::from_secs(CART_LIFETIME_DAYS.unsigned_abs() * SECONDS_PER_DAY),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationRun {
    pub carts_deleted: u64,
    pub carts_processed: u64,
    pub carts_pruned: u64,
    pub items_expired: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationStats {
    pub carts_deleted: u64,
    pub items_expired: u64,
    pub total_carts_processed: u64,
    pub last_run_at: Option<Timestamp>,
    pub last_run_duration: Option<Duration>,
}

struct ExpirationPass {
    carts: Arc<dyn CartsService>,
    config: ExpirationConfig,
    stats: Mutex<ExpirationStats>,
}

impl ExpirationPass {
    async fn prune(&self, now: Timestamp, run: &mut ExpirationRun) -> Result<(), WorkerError> {
        let added_before = cutoff(now, self.config.item_max_age);
        let mut after = None;

        loop {
            let page = self
                .carts
                .list_carts_with_items(after, self.config.page_size)
                .await?;

            let Some(last) = page.last() else {
                break;
            };

            after = Some(last.uuid);

            for record in page {
                run.carts_processed += 1;

                let cart_uuid = record.uuid;

                let cart = match Cart::try_from(record) {
                    Ok(cart) => cart,
                    Err(error) => {
                        run.failures += 1;

                        warn!(cart = %cart_uuid, %error, "skipping cart with unreadable items");

                        continue;
                    }
                };

                let mut items = cart.items;
                let pruned = items.prune_added_before(added_before);

                if pruned == 0 {
                    continue;
                }

                match self
                    .carts
                    .save_items(cart.tenant_uuid, cart.uuid, cart.version, items, None)
                    .await
                {
                    Ok(_) => {
                        run.carts_pruned += 1;
                        run.items_expired += pruned as u64;

                        debug!(
                            tenant = %cart.tenant_uuid,
                            cart = %cart.uuid,
                            pruned,
                            "pruned expired cart items"
                        );
                    }
                    Err(error) => {
                        run.failures += 1;

                        warn!(
                            tenant = %cart.tenant_uuid,
                            cart = %cart.uuid,
                            %error,
                            "failed to prune cart items"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Pass for ExpirationPass {
    type Output = ExpirationRun;

    async fn run(&self) -> Result<ExpirationRun, WorkerError> {
        let started = Instant::now();
        let now = Timestamp::now();

        let mut run = ExpirationRun {
            carts_deleted: self.carts.delete_expired_carts(now).await?,
            ..ExpirationRun::default()
        };

        self.prune(now, &mut run).await?;

        let took = started.elapsed();

        {
            let mut stats = self.stats.lock().await;

            stats.carts_deleted += run.carts_deleted;
            stats.items_expired += run.items_expired;
            stats.total_carts_processed += run.carts_processed;
            stats.last_run_at = Some(now);
            stats.last_run_duration = Some(took);
        }

        info!(
            carts_deleted = run.carts_deleted,
            carts_processed = run.carts_processed,
            items_expired = run.items_expired,
            failures = run.failures,
            duration_ms = took.as_millis(),
            "expiration pass finished"
        );

        Ok(run)
    }
}

pub struct ExpirationWorker {
    pass: Arc<ExpirationPass>,
    runner: Runner,
}

impl ExpirationWorker {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsService>, config: ExpirationConfig) -> Self {
        Self {
            runner: Runner::new(
                "expiration",
                Schedule {
                    interval: config.interval,
                    initial_delay: Duration::ZERO,
                },
            ),
            pass: Arc::new(ExpirationPass {
                carts,
                config,
                stats: Mutex::new(ExpirationStats::default()),
            }),
        }
    }

    /// Start sweeping, beginning with an immediate pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the worker is already running.
    pub async fn start(&self) -> Result<(), WorkerError> {
        self.runner.start(Arc::clone(&self.pass)).await
    }

    pub async fn stop(&self) {
        self.runner.stop().await;
    }

    /// Run one pass immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when expired carts cannot be deleted or a page of
    /// carts cannot be listed.
    pub async fn force_run(&self) -> Result<ExpirationRun, WorkerError> {
        self.runner.run_now(self.pass.as_ref()).await
    }

    pub async fn stats(&self) -> ExpirationStats {
        *self.pass.stats.lock().await
    }

    pub async fn status(&self) -> WorkerStatus {
        self.runner.status().await
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use mockall::predicate::eq;
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::{
                CartsService, CartsServiceError, MockCartsService,
                data::NewCartItem,
                models::{CartItems, CartUuid},
                records::CartRecord,
            },
            customers::records::CustomerUuid,
            tenants::records::TenantUuid,
        },
        test::{TestContext, test_cart},
    };

    use super::*;

    fn small_pages() -> ExpirationConfig {
        ExpirationConfig {
            page_size: 2,
            ..ExpirationConfig::default()
        }
    }

    fn empty_record(uuid: CartUuid) -> TestResult<CartRecord> {
        let now = Timestamp::now();

        Ok(CartRecord {
            uuid,
            tenant_uuid: TenantUuid::new(),
            customer_uuid: CustomerUuid::new(),
            items: CartItems::default().to_document()?,
            subtotal: 0,
            item_count: 0,
            has_unavailable_items: false,
            has_price_changes: false,
            unavailable_count: 0,
            version: 1,
            last_item_change: None,
            last_validated_at: None,
            expires_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    #[tokio::test]
    async fn pages_through_carts_by_id() -> TestResult {
        let first = empty_record(CartUuid::new())?;
        let second = empty_record(CartUuid::new())?;
        let third = empty_record(CartUuid::new())?;
        let second_uuid = second.uuid;
        let third_uuid = third.uuid;

        let mut carts = MockCartsService::new();

        carts.expect_delete_expired_carts().once().returning(|_| Ok(4));
        carts
            .expect_list_carts_with_items()
            .with(eq(None), eq(2))
            .return_once(move |_, _| Ok(vec![first, second]));
        carts
            .expect_list_carts_with_items()
            .with(eq(Some(second_uuid)), eq(2))
            .return_once(move |_, _| Ok(vec![third]));
        carts
            .expect_list_carts_with_items()
            .with(eq(Some(third_uuid)), eq(2))
            .return_once(|_, _| Ok(vec![]));
        carts.expect_save_items().never();

        let worker = ExpirationWorker::new(Arc::new(carts), small_pages());

        let run = worker.force_run().await?;

        assert_eq!(run.carts_deleted, 4);
        assert_eq!(run.carts_processed, 3);
        assert_eq!(run.items_expired, 0);

        Ok(())
    }

    #[tokio::test]
    async fn delete_failure_fails_the_pass() {
        let mut carts = MockCartsService::new();

        carts
            .expect_delete_expired_carts()
            .returning(|_| Err(CartsServiceError::Sql(sqlx::Error::PoolClosed)));
        carts.expect_list_carts_with_items().never();

        let worker = ExpirationWorker::new(Arc::new(carts), small_pages());

        let result = worker.force_run().await;

        assert!(
            matches!(result, Err(WorkerError::Carts(_))),
            "expected cart store error, got {result:?}"
        );
    }

    #[tokio::test]
    async fn prunes_old_lines_and_recomputes_totals() -> TestResult {
        let ctx = TestContext::new().await;
        let carts = ctx.carts.clone();

        let long_ago = Timestamp::now() - SignedDuration::from_hours(24 * 91);

        test_cart(&carts, ctx.tenant_uuid, ctx.customer_uuid, &["old"], long_ago).await?;

        carts
            .add_item(
                ctx.tenant_uuid,
                ctx.customer_uuid,
                NewCartItem::test_item("new", 1_000, 1),
            )
            .await?;

        let worker = ExpirationWorker::new(Arc::new(carts.clone()), small_pages());

        let run = worker.force_run().await?;

        assert_eq!(run.items_expired, 1);
        assert_eq!(run.carts_pruned, 1);

        let cart = carts.get_cart(ctx.tenant_uuid, ctx.customer_uuid).await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.as_slice()[0].product_id, "new");
        assert_eq!(cart.subtotal, 1_000);
        assert_eq!(cart.item_count, 1);

        let stats = worker.stats().await;

        assert_eq!(stats.items_expired, 1);
        assert_eq!(stats.total_carts_processed, 1);

        Ok(())
    }
}
