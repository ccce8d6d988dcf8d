//! Tenants Repository

use sqlx::{Postgres, Transaction, query_scalar};
use uuid::Uuid;

use crate::domain::tenants::records::TenantUuid;

const LIST_ACTIVE_TENANTS_SQL: &str = include_str!("sql/list_active_tenants.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgTenantsRepository;

impl PgTenantsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_active_tenants(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<TenantUuid>, sqlx::Error> {
        let uuids = query_scalar::<Postgres, Uuid>(LIST_ACTIVE_TENANTS_SQL)
            .fetch_all(&mut **tx)
            .await?;

        Ok(uuids.into_iter().map(TenantUuid::from_uuid).collect())
    }
}
