//! Shared test infrastructure.

mod db;
mod helpers;

pub(crate) use context::TestContext;
pub(crate) use helpers::{insert_customer, test_cart};
