//! Server configuration module

use cartkeeper_app::context::AppConfig;
use clap::Parser;

use crate::config::{
    catalog::CatalogConfig,
    db::DatabaseConfig,
    events::EventsConfig,
    notifications::NotificationsConfig,
    observability::{LoggingConfig, ObservabilityConfig},
    server::ServerRuntimeConfig,
    workers::WorkersConfig,
};

pub(crate) mod catalog;
pub(crate) mod db;
pub(crate) mod events;
pub(crate) mod notifications;
pub(crate) mod observability;
pub(crate) mod server;
pub(crate) mod workers;

/// Cartkeeper JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "cartkeeper-json", about = "Cartkeeper JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Product service settings.
    #[command(flatten)]
    pub catalog: CatalogConfig,

    /// Notification service settings.
    #[command(flatten)]
    pub notifications: NotificationsConfig,

    /// Background worker schedules.
    #[command(flatten)]
    pub workers: WorkersConfig,

    /// Catalog change event consumption.
    #[command(flatten)]
    pub events: EventsConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }

    /// Settings for building the application services.
    pub(crate) fn app(&self) -> AppConfig {
        AppConfig {
            database_url: self.database.database_url.clone(),
            max_connections: self.database.database_max_connections,
            catalog: self.catalog.client(),
            catalog_cache_ttl: self.catalog.cache_ttl(),
            notifications: self.notifications.client(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults_match_worker_defaults() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "cartkeeper-json",
            "--database-url",
            "postgres://localhost/cartkeeper",
        ])?;

        assert_eq!(config.server.port, 8698);
        assert_eq!(
            config.workers.reconciliation(),
            cartkeeper_app::workers::ReconciliationConfig::default()
        );
        assert_eq!(
            config.workers.expiration(),
            cartkeeper_app::workers::ExpirationConfig::default()
        );
        assert_eq!(config.workers.shutdown_deadline(), Duration::from_secs(5));
        assert_eq!(config.events.listener().max_deliver, 3);
        assert_eq!(config.app().max_connections, 10);
        assert_eq!(config.app().catalog_cache_ttl, Duration::from_secs(60));

        Ok(())
    }
}
