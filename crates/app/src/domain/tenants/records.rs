//! Tenant Records

use crate::uuids::TypedUuid;

/// Marker for tenant identifiers. Tenants are owned by another service;
/// this crate only scopes its own rows by them.
#[derive(Debug)]
pub struct Tenant;

/// Tenant UUID
pub type TenantUuid = TypedUuid<Tenant>;
