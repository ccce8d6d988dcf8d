//! Abandonment sweep worker.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    domain::{
        abandoned_carts::{AbandonedCartsService, AbandonedCartsServiceError},
        tenants::{TenantsService, records::TenantUuid},
    },
    workers::{
        errors::WorkerError,
        runner::{Pass, Runner, Schedule, WorkerStatus},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbandonmentConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
}

impl Default for AbandonmentConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            initial_delay: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbandonmentRun {
    pub tenants: u64,
    pub detected: u64,
    pub reminders_sent: u64,
    pub reminders_failed: u64,
    pub expired: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbandonmentStats {
    pub detected: u64,
    pub reminders_sent: u64,
    pub reminders_failed: u64,
    pub expired: u64,
    pub failures: u64,
    pub last_run_at: Option<Timestamp>,
    pub last_run_duration: Option<Duration>,
}

struct AbandonmentPass {
    tenants: Arc<dyn TenantsService>,
    engine: Arc<dyn AbandonedCartsService>,
    stats: Mutex<AbandonmentStats>,
}

impl AbandonmentPass {
    async fn sweep_tenant(
        &self,
        tenant: TenantUuid,
        run: &mut AbandonmentRun,
    ) -> Result<(), AbandonedCartsServiceError> {
        run.detected += self.engine.detect(tenant).await?;

        let reminders = self.engine.send_reminders(tenant, None).await?;

        run.reminders_sent += reminders.sent;
        run.reminders_failed += reminders.failed;
        run.expired += self.engine.expire(tenant).await?;

        Ok(())
    }
}

#[async_trait]
impl Pass for AbandonmentPass {
    type Output = AbandonmentRun;

    async fn run(&self) -> Result<AbandonmentRun, WorkerError> {
        let started = Instant::now();
        let started_at = Timestamp::now();

        let tenants = self.tenants.list_active_tenants().await?;

        let mut run = AbandonmentRun {
            tenants: tenants.len() as u64,
            ..AbandonmentRun::default()
        };

        for tenant in tenants {
            if let Err(error) = self.sweep_tenant(tenant, &mut run).await {
                run.failures += 1;

                warn!(tenant = %tenant, %error, "abandoned cart sweep failed");
            }
        }

        let took = started.elapsed();

        {
            let mut stats = self.stats.lock().await;

            stats.detected += run.detected;
            stats.reminders_sent += run.reminders_sent;
            stats.reminders_failed += run.reminders_failed;
            stats.expired += run.expired;
            stats.failures += run.failures;
            stats.last_run_at = Some(started_at);
            stats.last_run_duration = Some(took);
        }

        info!(
            tenants = run.tenants,
            detected = run.detected,
            reminders_sent = run.reminders_sent,
            expired = run.expired,
            failures = run.failures,
            duration_ms = took.as_millis(),
            "abandoned cart sweep finished"
        );

        Ok(run)
    }
}

/// Runs detection, due reminders and expiry for every tenant with carts.
pub struct AbandonmentWorker {
    pass: Arc<AbandonmentPass>,
    runner: Runner,
}

impl AbandonmentWorker {
    #[must_use]
    pub fn new(
        tenants: Arc<dyn TenantsService>,
        engine: Arc<dyn AbandonedCartsService>,
        config: AbandonmentConfig,
    ) -> Self {
        Self {
            runner: Runner::new(
                "abandonment",
                Schedule {
                    interval: config.interval,
                    initial_delay: config.initial_delay,
                },
            ),
            pass: Arc::new(AbandonmentPass {
                tenants,
                engine,
                stats: Mutex::new(AbandonmentStats::default()),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns an error when the worker is already running.
    pub async fn start(&self) -> Result<(), WorkerError> {
        self.runner.start(Arc::clone(&self.pass)).await
    }

    pub async fn stop(&self) {
        self.runner.stop().await;
    }

    /// Sweep every tenant now.
    ///
    /// # Errors
    ///
    /// Returns an error when tenants cannot be listed.
    pub async fn force_run(&self) -> Result<AbandonmentRun, WorkerError> {
        self.runner.run_now(self.pass.as_ref()).await
    }

    pub async fn stats(&self) -> AbandonmentStats {
        *self.pass.stats.lock().await
    }

    pub async fn status(&self) -> WorkerStatus {
        self.runner.status().await
    }
}
