//! Reconciliation worker.
//!
//! Re-validates carts that have not been checked against the catalog for a
//! while. Each pass picks the stalest carts first and validates them with a
//! bounded number in flight, so a slow catalog delays one cart at a time
//! instead of the whole batch.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinSet,
};
use tracing::{info, warn};

use crate::{
    domain::{carts::CartsService, validation::CartValidation},
    workers::{
        errors::WorkerError,
        runner::{Pass, Runner, Schedule, WorkerStatus, cutoff},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    pub interval: Duration,
    pub initial_delay: Duration,

    /// Carts validated more recently than this are left alone.
    pub stale_age: Duration,

    /// A pass selects up to ten batches of carts.
    pub batch_size: u32,

    /// Validations in flight at once.
    pub concurrency: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            initial_delay: Duration::from_secs(30),
            stale_age: Duration::from_secs(60 * 60),
            batch_size: 50,
            concurrency: 5,
        }
    }
}

impl ReconciliationConfig {
    fn pass_limit(&self) -> u32 {
        self.batch_size.saturating_mul(10)
    }
}

/// Outcome of a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationRun {
    pub carts_selected: u64,
    pub carts_validated: u64,
    pub items_updated: u64,
    pub unavailable_found: u64,
    pub out_of_stock_found: u64,
    pub price_changes_found: u64,
    pub validation_errors: u64,
}

/// Totals across every pass since the worker was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationStats {
    pub carts_validated: u64,
    pub items_updated: u64,
    pub unavailable_found: u64,
    pub out_of_stock_found: u64,
    pub price_changes_found: u64,
    pub validation_errors: u64,
    pub last_run_at: Option<Timestamp>,
    pub last_run_duration: Option<Duration>,
}

impl ReconciliationStats {
    fn absorb(&mut self, run: &ReconciliationRun, at: Timestamp, took: Duration) {
        self.carts_validated += run.carts_validated;
        self.items_updated += run.items_updated;
        self.unavailable_found += run.unavailable_found;
        self.out_of_stock_found += run.out_of_stock_found;
        self.price_changes_found += run.price_changes_found;
        self.validation_errors += run.validation_errors;
        self.last_run_at = Some(at);
        self.last_run_duration = Some(took);
    }
}

struct ReconciliationPass {
    carts: Arc<dyn CartsService>,
    validator: Arc<dyn CartValidation>,
    config: ReconciliationConfig,
    stats: Mutex<ReconciliationStats>,
}

#[async_trait]
impl Pass for ReconciliationPass {
    type Output = ReconciliationRun;

    async fn run(&self) -> Result<ReconciliationRun, WorkerError> {
        let started = Instant::now();
        let started_at = Timestamp::now();

        let stale_before = cutoff(started_at, self.config.stale_age);

        let carts = self
            .carts
            .list_stale_carts(stale_before, self.config.pass_limit())
            .await?;

        let mut run = ReconciliationRun {
            carts_selected: carts.len() as u64,
            ..ReconciliationRun::default()
        };

        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for cart in carts {
            let permit = Arc::clone(&permits).acquire_owned().await?;
            let validator = Arc::clone(&self.validator);

            tasks.spawn(async move {
                let result = validator.validate(cart.tenant_uuid, cart.customer_uuid).await;

                drop(permit);

                (cart, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(result))) => {
                    run.carts_validated += 1;
                    run.items_updated += u64::from(result.items_updated);
                    run.unavailable_found += u64::from(result.unavailable_count);
                    run.out_of_stock_found += u64::from(result.out_of_stock_count);
                    run.price_changes_found += u64::from(result.price_changed_count);
                }
                Ok((cart, Err(error))) => {
                    run.validation_errors += 1;

                    warn!(
                        tenant = %cart.tenant_uuid,
                        cart = %cart.uuid,
                        %error,
                        "failed to validate cart"
                    );
                }
                Err(error) => {
                    run.validation_errors += 1;

                    warn!(%error, "cart validation task failed");
                }
            }
        }

        let took = started.elapsed();

        self.stats.lock().await.absorb(&run, started_at, took);

        info!(
            carts_selected = run.carts_selected,
            carts_validated = run.carts_validated,
            items_updated = run.items_updated,
            validation_errors = run.validation_errors,
            duration_ms = took.as_millis(),
            "reconciliation pass finished"
        );

        Ok(run)
    }
}

pub struct ReconciliationWorker {
    pass: Arc<ReconciliationPass>,
    runner: Runner,
}

impl ReconciliationWorker {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartsService>,
        validator: Arc<dyn CartValidation>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            runner: Runner::new(
                "reconciliation",
                Schedule {
                    interval: config.interval,
                    initial_delay: config.initial_delay,
                },
            ),
            pass: Arc::new(ReconciliationPass {
                carts,
                validator,
                config,
                stats: Mutex::new(ReconciliationStats::default()),
            }),
        }
    }

    /// Start validating on the configured schedule.
    ///
    /// # Errors
    ///
    /// Returns an error when the worker is already running.
    pub async fn start(&self) -> Result<(), WorkerError> {
        self.runner.start(Arc::clone(&self.pass)).await
    }

    /// Stop the schedule, waiting for a pass in flight to finish.
    pub async fn stop(&self) {
        self.runner.stop().await;
    }

    /// Run one pass immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when stale carts cannot be listed. Individual carts
    /// failing validation are counted, not returned.
    pub async fn force_run(&self) -> Result<ReconciliationRun, WorkerError> {
        self.runner.run_now(self.pass.as_ref()).await
    }

    pub async fn stats(&self) -> ReconciliationStats {
        *self.pass.stats.lock().await
    }

    pub async fn status(&self) -> WorkerStatus {
        self.runner.status().await
    }
}
