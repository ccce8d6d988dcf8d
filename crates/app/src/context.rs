//! App Context

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::{
        abandoned_carts::{AbandonedCartsService, PgAbandonedCartStore, RecoveryEngine},
        carts::{CartsService, PgCartsService},
        catalog::{
            CachedProductGateway, ProductGateway, ProductGatewayError,
            client::{HttpProductSource, ProductServiceConfig},
        },
        customers::{CustomersService, PgCustomersService},
        notifications::{HttpNotificationSender, NotificationError, NotificationServiceConfig},
        tenants::{PgTenantsService, TenantsService},
        validation::{CartValidation, CartValidator},
    },
    events::{
        CartEventHandler, EventHandler,
        dead_letters::{DeadLetterStore, PgDeadLetterStore},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to build product service client")]
    Catalog(#[source] ProductGatewayError),

    #[error("failed to build notification service client")]
    Notifications(#[source] NotificationError),
}

/// Everything needed to build the application's services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub catalog: ProductServiceConfig,

    /// How long product lookups stay cached.
    pub catalog_cache_ttl: Duration,

    pub notifications: NotificationServiceConfig,
}

#[derive(Clone)]
pub struct AppContext {
    pub carts: Arc<dyn CartsService>,
    pub customers: Arc<dyn CustomersService>,
    pub tenants: Arc<dyn TenantsService>,
    pub products: Arc<dyn ProductGateway>,
    pub validator: Arc<dyn CartValidation>,
    pub abandoned_carts: Arc<dyn AbandonedCartsService>,
    pub events: Arc<dyn EventHandler>,
    pub dead_letters: Arc<dyn DeadLetterStore>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Connect to the database and build every service.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails or an
    /// HTTP client cannot be built.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppInitError> {
        let pool = database::connect(&config.database_url, config.max_connections)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool);

        let source = HttpProductSource::new(config.catalog).map_err(AppInitError::Catalog)?;
        let notifier = HttpNotificationSender::new(config.notifications)
            .map_err(AppInitError::Notifications)?;

        let carts: Arc<dyn CartsService> = Arc::new(PgCartsService::new(db.clone()));
        let customers: Arc<dyn CustomersService> = Arc::new(PgCustomersService::new(db.clone()));

        let products: Arc<dyn ProductGateway> = Arc::new(CachedProductGateway::new(
            Arc::new(source),
            config.catalog_cache_ttl,
        ));

        let abandoned_carts = RecoveryEngine::new(
            Arc::new(PgAbandonedCartStore::new(db.clone())),
            Arc::clone(&carts),
            Arc::clone(&customers),
            Arc::new(notifier),
        );

        Ok(Self {
            validator: Arc::new(CartValidator::new(Arc::clone(&carts), Arc::clone(&products))),
            events: Arc::new(CartEventHandler::new(Arc::clone(&carts), Arc::clone(&products))),
            tenants: Arc::new(PgTenantsService::new(db.clone())),
            dead_letters: Arc::new(PgDeadLetterStore::new(db)),
            abandoned_carts: Arc::new(abandoned_carts),
            carts,
            customers,
            products,
        })
    }
}
