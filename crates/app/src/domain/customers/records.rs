//! Customer Records

use serde::{Deserialize, Serialize};

use crate::uuids::TypedUuid;

/// Marker for customer identifiers.
#[derive(Debug)]
pub struct Customer;

/// Customer UUID
pub type CustomerUuid = TypedUuid<Customer>;

/// The contact details needed for cart recovery outreach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub uuid: CustomerUuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
