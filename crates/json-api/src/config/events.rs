//! Events Config

use std::time::Duration;

use cartkeeper_app::events::ListenerConfig;
use clap::Args;

/// How catalog change events reach this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum EventTransport {
    /// In-process channels fed through `POST /events/{stream}`.
    Memory,

    /// Kafka or Redpanda consumer groups.
    Kafka,
}

/// Catalog change event settings.
#[derive(Debug, Args)]
pub struct EventsConfig {
    /// Event transport (memory, kafka)
    #[arg(long, env = "EVENTS_TRANSPORT", value_enum, default_value_t = EventTransport::Memory)]
    pub events_transport: EventTransport,

    /// Comma separated broker addresses
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    pub kafka_brokers: String,

    /// Consumer group prefix
    #[arg(long, env = "KAFKA_GROUP_PREFIX", default_value = "cartkeeper")]
    pub kafka_group_prefix: String,

    /// Deliveries allowed per message before it is parked
    #[arg(long, env = "EVENTS_MAX_DELIVER", default_value_t = 3)]
    pub events_max_deliver: u32,

    /// Seconds a handler may run before the delivery counts as failed
    #[arg(long, env = "EVENTS_ACK_WAIT_SECONDS", default_value_t = 30)]
    pub events_ack_wait_seconds: u64,
}

impl EventsConfig {
    pub(crate) fn listener(&self) -> ListenerConfig {
        ListenerConfig {
            max_deliver: self.events_max_deliver,
            ack_wait: Duration::from_secs(self.events_ack_wait_seconds),
        }
    }
}
