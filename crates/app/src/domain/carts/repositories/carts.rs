//! Carts Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::{amount_param, count_param, try_get_amount, try_get_count},
    domain::{
        carts::{
            data::CartWrite,
            models::{CartRef, CartUuid},
            records::CartRecord,
        },
        customers::records::CustomerUuid,
        tenants::records::TenantUuid,
    },
};

const GET_CART_SQL: &str = include_str!("../sql/get_cart.sql");
const INSERT_CART_SQL: &str = include_str!("../sql/insert_cart.sql");
const UPDATE_CART_SQL: &str = include_str!("../sql/update_cart.sql");
const DELETE_CART_SQL: &str = include_str!("../sql/delete_cart.sql");
const LIST_STALE_CARTS_SQL: &str = include_str!("../sql/list_stale_carts.sql");
const DELETE_EXPIRED_CARTS_SQL: &str = include_str!("../sql/delete_expired_carts.sql");
const LIST_CARTS_WITH_ITEMS_SQL: &str = include_str!("../sql/list_carts_with_items.sql");
const FIND_CARTS_WITH_PRODUCT_SQL: &str = include_str!("../sql/find_carts_with_product.sql");
const LIST_INACTIVE_CARTS_SQL: &str = include_str!("../sql/list_inactive_carts.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(tenant.into_uuid())
            .bind(customer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Insert a new cart. Returns `None` when a concurrent writer created the
    /// customer's cart first.
    pub(crate) async fn insert_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        customer: CustomerUuid,
        write: &CartWrite,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        let expires_at = write.expires_at.unwrap_or_else(Timestamp::now);

        query_as::<Postgres, CartRecord>(INSERT_CART_SQL)
            .bind(CartUuid::new().into_uuid())
            .bind(tenant.into_uuid())
            .bind(customer.into_uuid())
            .bind(&write.items)
            .bind(amount_param(write.totals.subtotal)?)
            .bind(amount_param(write.totals.item_count)?)
            .bind(write.totals.has_unavailable_items)
            .bind(write.totals.has_price_changes)
            .bind(count_param(write.totals.unavailable_count)?)
            .bind(write.last_item_change.map(SqlxTimestamp::from))
            .bind(SqlxTimestamp::from(expires_at))
            .fetch_optional(&mut **tx)
            .await
    }

    /// Compare-and-swap update. Returns `None` when `expected_version` is no
    /// longer current.
    pub(crate) async fn update_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        cart: CartUuid,
        expected_version: i64,
        write: &CartWrite,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(UPDATE_CART_SQL)
            .bind(tenant.into_uuid())
            .bind(cart.into_uuid())
            .bind(expected_version)
            .bind(&write.items)
            .bind(amount_param(write.totals.subtotal)?)
            .bind(amount_param(write.totals.item_count)?)
            .bind(write.totals.has_unavailable_items)
            .bind(write.totals.has_price_changes)
            .bind(count_param(write.totals.unavailable_count)?)
            .bind(write.last_item_change.map(SqlxTimestamp::from))
            .bind(write.expires_at.map(SqlxTimestamp::from))
            .bind(write.last_validated_at.map(SqlxTimestamp::from))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn delete_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        customer: CustomerUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_SQL)
            .bind(tenant.into_uuid())
            .bind(customer.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_stale_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRef>, sqlx::Error> {
        query_as::<Postgres, CartRef>(LIST_STALE_CARTS_SQL)
            .bind(SqlxTimestamp::from(stale_before))
            .bind(i64::from(limit))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn delete_expired_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_EXPIRED_CARTS_SQL)
            .bind(SqlxTimestamp::from(now))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_carts_with_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        after: Option<CartUuid>,
        limit: u32,
    ) -> Result<Vec<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(LIST_CARTS_WITH_ITEMS_SQL)
            .bind(after.map(CartUuid::into_uuid))
            .bind(i64::from(limit))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_carts_with_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        product_id: &str,
    ) -> Result<Vec<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(FIND_CARTS_WITH_PRODUCT_SQL)
            .bind(tenant.into_uuid())
            .bind(product_id)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_inactive_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        inactive_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(LIST_INACTIVE_CARTS_SQL)
            .bind(tenant.into_uuid())
            .bind(SqlxTimestamp::from(inactive_before))
            .bind(i64::from(limit))
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            items: row.try_get("items")?,
            subtotal: try_get_amount(row, "subtotal")?,
            item_count: try_get_amount(row, "item_count")?,
            has_unavailable_items: row.try_get("has_unavailable_items")?,
            has_price_changes: row.try_get("has_price_changes")?,
            unavailable_count: try_get_count(row, "unavailable_count")?,
            version: row.try_get("version")?,
            last_item_change: row
                .try_get::<Option<SqlxTimestamp>, _>("last_item_change")?
                .map(SqlxTimestamp::to_jiff),
            last_validated_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_validated_at")?
                .map(SqlxTimestamp::to_jiff),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartRef {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            last_validated_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_validated_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
