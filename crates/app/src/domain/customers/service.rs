//! Customers service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        customers::{
            errors::CustomersServiceError,
            records::{CustomerContact, CustomerUuid},
            repository::PgCustomersRepository,
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCustomersService {
    db: Db,
    repository: PgCustomersRepository,
}

impl PgCustomersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCustomersRepository::new(),
        }
    }
}

#[async_trait]
impl CustomersService for PgCustomersService {
    async fn get_contact(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CustomerContact, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let contact = self
            .repository
            .get_contact(&mut tx, tenant, customer)
            .await?;

        tx.commit().await?;

        Ok(contact)
    }
}

#[automock]
#[async_trait]
pub trait CustomersService: Send + Sync {
    /// Contact details of a live customer.
    async fn get_contact(
        &self,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<CustomerContact, CustomersServiceError>;
}
