//! Tenants service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::tenants::{
        errors::TenantsServiceError, records::TenantUuid, repository::PgTenantsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgTenantsService {
    db: Db,
    repository: PgTenantsRepository,
}

impl PgTenantsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgTenantsRepository::new(),
        }
    }
}

#[async_trait]
impl TenantsService for PgTenantsService {
    async fn list_active_tenants(&self) -> Result<Vec<TenantUuid>, TenantsServiceError> {
        let mut tx = self.db.begin().await?;

        let tenants = self.repository.list_active_tenants(&mut tx).await?;

        tx.commit().await?;

        Ok(tenants)
    }
}

#[automock]
#[async_trait]
/// Tenant discovery for cross-tenant background sweeps.
pub trait TenantsService: Send + Sync {
    /// Tenants that currently hold a non-empty cart or an open abandoned cart.
    async fn list_active_tenants(&self) -> Result<Vec<TenantUuid>, TenantsServiceError>;
}
