//! Catalog Change Events
//!
//! Product and inventory events are consumed from two independent streams and
//! applied to the carts they affect. Messages that keep failing end up in the
//! dead letter table instead of being dropped.

pub mod dead_letters;
pub mod errors;
pub mod handlers;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod listener;
pub mod models;
pub mod source;

pub use errors::EventError;
pub use handlers::{CartEventHandler, EventHandler};
pub use listener::{EventListener, ListenerConfig, ListenerStats};
pub use source::{DeliverySource, MemoryPublisher, MemorySource};
