//! Cart validation and abandoned-cart recovery.

pub mod context;
pub mod database;
pub mod domain;
pub mod events;
pub mod uuids;
pub mod workers;

#[cfg(test)]
mod test;
