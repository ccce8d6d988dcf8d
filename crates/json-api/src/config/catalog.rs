//! Catalog Config

use std::time::Duration;

use cartkeeper_app::domain::catalog::client::ProductServiceConfig;
use clap::Args;

/// Product service settings.
#[derive(Debug, Args)]
pub struct CatalogConfig {
    /// Product service base URL
    #[arg(
        long,
        env = "PRODUCTS_SERVICE_URL",
        default_value = "http://products-service:8083"
    )]
    pub products_service_url: String,

    /// Seconds a product lookup stays cached
    #[arg(long, env = "PRODUCTS_CACHE_TTL_SECONDS", default_value_t = 60)]
    pub products_cache_ttl_seconds: u64,

    /// Product service request timeout in seconds
    #[arg(long, env = "PRODUCTS_TIMEOUT_SECONDS", default_value_t = 10)]
    pub products_timeout_seconds: u64,
}

impl CatalogConfig {
    pub(crate) fn client(&self) -> ProductServiceConfig {
        ProductServiceConfig {
            base_url: self.products_service_url.clone(),
            timeout: Duration::from_secs(self.products_timeout_seconds),
        }
    }

    pub(crate) fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.products_cache_ttl_seconds)
    }
}
