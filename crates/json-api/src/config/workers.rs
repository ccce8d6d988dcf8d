//! Worker Config

use std::time::Duration;

use cartkeeper_app::workers::{AbandonmentConfig, ExpirationConfig, ReconciliationConfig};
use clap::Args;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Background worker schedules.
#[derive(Debug, Args)]
pub struct WorkersConfig {
    /// Run the background workers in this process
    #[arg(long, env = "WORKERS_ENABLED", default_value_t = true)]
    pub workers_enabled: bool,

    /// Seconds between reconciliation passes
    #[arg(long, env = "RECONCILIATION_INTERVAL_SECONDS", default_value_t = 900)]
    pub reconciliation_interval_seconds: u64,

    /// Seconds before the first reconciliation pass
    #[arg(long, env = "RECONCILIATION_INITIAL_DELAY_SECONDS", default_value_t = 30)]
    pub reconciliation_initial_delay_seconds: u64,

    /// Carts validated within this many seconds are skipped
    #[arg(long, env = "RECONCILIATION_STALE_AGE_SECONDS", default_value_t = 3_600)]
    pub reconciliation_stale_age_seconds: u64,

    /// Carts per reconciliation batch
    #[arg(long, env = "RECONCILIATION_BATCH_SIZE", default_value_t = 50)]
    pub reconciliation_batch_size: u32,

    /// Validations in flight at once
    #[arg(long, env = "RECONCILIATION_CONCURRENCY", default_value_t = 5)]
    pub reconciliation_concurrency: usize,

    /// Seconds between expiration passes
    #[arg(long, env = "EXPIRATION_INTERVAL_SECONDS", default_value_t = 3_600)]
    pub expiration_interval_seconds: u64,

    /// Cart lines older than this many days are pruned
    #[arg(long, env = "EXPIRATION_ITEM_MAX_AGE_DAYS", default_value_t = 90)]
    pub expiration_item_max_age_days: u64,

    /// Carts per expiration page
    #[arg(long, env = "EXPIRATION_PAGE_SIZE", default_value_t = 100)]
    pub expiration_page_size: u32,

    /// Seconds between abandoned cart sweeps
    #[arg(long, env = "ABANDONMENT_INTERVAL_SECONDS", default_value_t = 900)]
    pub abandonment_interval_seconds: u64,

    /// Seconds to wait for workers to finish on shutdown
    #[arg(long, env = "SHUTDOWN_DEADLINE_SECONDS", default_value_t = 5)]
    pub shutdown_deadline_seconds: u64,
}

impl WorkersConfig {
    pub(crate) fn reconciliation(&self) -> ReconciliationConfig {
        ReconciliationConfig {
            interval: Duration::from_secs(self.reconciliation_interval_seconds),
            initial_delay: Duration::from_secs(self.reconciliation_initial_delay_seconds),
            stale_age: Duration::from_secs(self.reconciliation_stale_age_seconds),
            batch_size: self.reconciliation_batch_size,
            concurrency: self.reconciliation_concurrency,
        }
    }

    pub(crate) fn expiration(&self) -> ExpirationConfig {
        ExpirationConfig {
            interval: Duration::from_secs(self.expiration_interval_seconds),
            item_max_age: Duration::from_secs(
                self.expiration_item_max_age_days.saturating_mul(SECONDS_PER_DAY),
            ),
            page_size: self.expiration_page_size,
        }
    }

    pub(crate) fn abandonment(&self) -> AbandonmentConfig {
        AbandonmentConfig {
            interval: Duration::from_secs(self.abandonment_interval_seconds),
            ..AbandonmentConfig::default()
        }
    }

    pub(crate) fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_deadline_seconds)
    }
}
