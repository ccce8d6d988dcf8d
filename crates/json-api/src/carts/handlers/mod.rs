//! Cart Handlers

pub(crate) mod accept_prices;
pub(crate) mod clear;
pub(crate) mod get;
pub(crate) mod remove_unavailable;
pub(crate) mod sync;
pub(crate) mod validate;
