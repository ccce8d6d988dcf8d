//! Customers Repository

use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    customers::records::{CustomerContact, CustomerUuid},
    tenants::records::TenantUuid,
};

const GET_CUSTOMER_CONTACT_SQL: &str = include_str!("sql/get_customer_contact.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCustomersRepository;

impl PgCustomersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_contact(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CustomerContact, sqlx::Error> {
        query_as::<Postgres, CustomerContact>(GET_CUSTOMER_CONTACT_SQL)
            .bind(tenant.into_uuid())
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CustomerContact {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CustomerUuid::from_uuid(row.try_get("uuid")?),
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
        })
    }
}
