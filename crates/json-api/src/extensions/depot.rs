//! Depot helper extensions.

use std::any::Any;

use cartkeeper_app::domain::tenants::records::TenantUuid;
use salvo::prelude::{Depot, StatusError};

const TENANT_DEPOT_KEY: &str = "tenant_uuid";

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    fn insert_tenant_uuid(&mut self, tenant: TenantUuid);

    /// The tenant resolved by the tenant middleware.
    fn tenant_uuid_or_400(&self) -> Result<TenantUuid, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_tenant_uuid(&mut self, tenant: TenantUuid) {
        self.insert(TENANT_DEPOT_KEY, tenant);
    }

    fn tenant_uuid_or_400(&self) -> Result<TenantUuid, StatusError> {
        self.get::<TenantUuid>(TENANT_DEPOT_KEY)
            .copied()
            .map_err(|_ignored| StatusError::bad_request().brief("Missing tenant"))
    }
}
