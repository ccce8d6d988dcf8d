use std::time::Duration;

use cartkeeper_app::{
    context::{AppConfig, AppContext},
    database::DEFAULT_MAX_CONNECTIONS,
    domain::{
        catalog::{DEFAULT_CACHE_TTL, client::ProductServiceConfig},
        notifications::NotificationServiceConfig,
    },
};
use clap::{Args, Parser, Subcommand};

mod abandoned;
mod expire;
mod reconcile;

#[derive(Debug, Parser)]
#[command(name = "cartkeeper-app", about = "Cartkeeper CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass over stale carts
    Reconcile(reconcile::ReconcileArgs),

    /// Run one expiration pass
    ExpireCarts(expire::ExpireArgs),

    /// Abandoned cart maintenance for one tenant
    Abandoned(abandoned::AbandonedCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Reconcile(args) => reconcile::run(args).await,
            Commands::ExpireCarts(args) => expire::run(args).await,
            Commands::Abandoned(command) => abandoned::run(command).await,
        }
    }
}

/// Connection settings shared by every command.
#[derive(Debug, Args)]
pub(crate) struct ServiceArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Product service base URL
    #[arg(
        long,
        env = "PRODUCTS_SERVICE_URL",
        default_value = "http://products-service:8083"
    )]
    products_service_url: String,

    /// Notification service base URL
    #[arg(
        long,
        env = "NOTIFICATION_SERVICE_URL",
        default_value = "http://notification-service:8090"
    )]
    notification_service_url: String,

    /// Storefront base URL used in recovery links
    #[arg(long, env = "STOREFRONT_URL", default_value = "http://localhost:3000")]
    storefront_url: String,
}

impl ServiceArgs {
    pub(crate) async fn connect(self) -> Result<AppContext, String> {
        let timeout = Duration::from_secs(10);

        AppContext::from_config(AppConfig {
            database_url: self.database_url,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            catalog: ProductServiceConfig {
                base_url: self.products_service_url,
                timeout,
            },
            catalog_cache_ttl: DEFAULT_CACHE_TTL,
            notifications: NotificationServiceConfig {
                base_url: self.notification_service_url,
                storefront_url: self.storefront_url,
                timeout,
            },
        })
        .await
        .map_err(|error| format!("failed to initialise services: {error}"))
    }
}
