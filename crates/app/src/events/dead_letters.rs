//! Dead letters.

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction, query_scalar};

use crate::{
    database::{Db, count_param},
    domain::tenants::records::TenantUuid,
    events::{errors::EventError, models::EventStream},
};

const INSERT_FAILED_EVENT_SQL: &str = include_str!("sql/insert_failed_event.sql");

/// A message that could not be handled within its delivery allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEvent {
    pub stream: EventStream,
    pub subject: String,

    /// Tenant named by the payload, when it could be read.
    pub tenant_uuid: Option<TenantUuid>,

    pub payload: Vec<u8>,
    pub error_message: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgDeadLetterRepository;

impl PgDeadLetterRepository {
    pub(crate) async fn insert_failed_event(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &FailedEvent,
    ) -> Result<i64, sqlx::Error> {
        query_scalar(INSERT_FAILED_EVENT_SQL)
            .bind(event.stream.as_str())
            .bind(&event.subject)
            .bind(event.tenant_uuid.map(TenantUuid::into_uuid))
            .bind(&event.payload)
            .bind(&event.error_message)
            .bind(count_param(event.attempts)?)
            .fetch_one(&mut **tx)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct PgDeadLetterStore {
    db: Db,
    repository: PgDeadLetterRepository,
}

impl PgDeadLetterStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgDeadLetterRepository,
        }
    }
}

#[async_trait]
impl DeadLetterStore for PgDeadLetterStore {
    async fn record(&self, event: FailedEvent) -> Result<i64, EventError> {
        let mut tx = self.db.begin().await?;

        let id = self.repository.insert_failed_event(&mut tx, &event).await?;

        tx.commit().await?;

        Ok(id)
    }
}

#[automock]
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Park a failed message for inspection. Returns its id.
    async fn record(&self, event: FailedEvent) -> Result<i64, EventError>;
}

#[cfg(test)]
mod tests {
    use sqlx::Row;
    use testresult::TestResult;

    use crate::{database::Db, test::TestContext};

    use super::*;

    #[tokio::test]
    async fn records_pending_dead_letter() -> TestResult {
        let ctx = TestContext::new().await;
        let store = PgDeadLetterStore::new(Db::new(ctx.db.pool().clone()));

        let id = store
            .record(FailedEvent {
                stream: EventStream::Inventory,
                subject: "inventory.low_stock".to_string(),
                tenant_uuid: Some(ctx.tenant_uuid),
                payload: b"{}".to_vec(),
                error_message: "cart was modified concurrently".to_string(),
                attempts: 3,
            })
            .await?;

        let row = sqlx::query("SELECT stream, status, attempts FROM failed_events WHERE id = $1")
            .bind(id)
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(row.try_get::<String, _>("stream")?, "INVENTORY_EVENTS");
        assert_eq!(row.try_get::<String, _>("status")?, "PENDING");
        assert_eq!(row.try_get::<i32, _>("attempts")?, 3);

        Ok(())
    }
}
