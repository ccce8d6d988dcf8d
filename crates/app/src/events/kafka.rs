//! Kafka-compatible delivery source.

use std::collections::VecDeque;

use async_trait::async_trait;
use rdkafka::{
    ClientConfig, Message, Offset, TopicPartitionList,
    consumer::{CommitMode, Consumer, StreamConsumer},
};
use tracing::{info, warn};

use crate::events::{
    errors::EventError,
    models::EventStream,
    source::{Delivery, DeliverySource, LogPosition},
};

/// Connection settings for the broker.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,

    /// Consumer group prefix. The host name and stream are appended.
    pub group_prefix: String,

    /// Name of this host, shared by every consumer it runs.
    pub hostname: String,
}

impl KafkaConfig {
    #[must_use]
    pub fn group_id(&self, stream: EventStream) -> String {
        format!(
            "{}-{}-{}",
            self.group_prefix,
            self.hostname,
            stream.consumer_suffix()
        )
    }
}

/// Consumes one stream with manual offset commits. A message handed back
/// for retry is replayed locally before the next one is polled, and its
/// offset is only committed once it is acknowledged.
pub struct KafkaSource {
    stream: EventStream,
    consumer: StreamConsumer,
    retries: VecDeque<Delivery>,
}

impl std::fmt::Debug for KafkaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSource")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl KafkaSource {
    /// Create a consumer and subscribe it to the stream's topic.
    ///
    /// # Errors
    ///
    /// Returns an error when the consumer cannot be created or subscribed.
    pub fn connect(config: &KafkaConfig, stream: EventStream) -> Result<Self, EventError> {
        let group_id = config.group_id(stream);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| EventError::Transport(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[stream.topic()])
            .map_err(|e| EventError::Transport(format!("failed to subscribe: {e}")))?;

        info!(
            stream = %stream,
            topic = stream.topic(),
            consumer_group = %group_id,
            "subscribed to catalog events"
        );

        Ok(Self {
            stream,
            consumer,
            retries: VecDeque::new(),
        })
    }
}

#[async_trait]
impl DeliverySource for KafkaSource {
    async fn next(&mut self) -> Option<Result<Delivery, EventError>> {
        if let Some(delivery) = self.retries.pop_front() {
            return Some(Ok(delivery));
        }

        let message = match self.consumer.recv().await {
            Ok(message) => message,
            Err(e) => {
                return Some(Err(EventError::Transport(format!(
                    "failed to receive message: {e}"
                ))));
            }
        };

        let subject = message
            .key()
            .and_then(|key| std::str::from_utf8(key).ok())
            .map_or_else(|| self.stream.subject_prefix().to_string(), ToString::to_string);

        Some(Ok(Delivery {
            stream: self.stream,
            subject,
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            attempt: 1,
            position: Some(LogPosition {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
            }),
        }))
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), EventError> {
        let Some(position) = &delivery.position else {
            return Ok(());
        };

        let mut offsets = TopicPartitionList::new();

        offsets
            .add_partition_offset(
                &position.topic,
                position.partition,
                Offset::Offset(position.offset + 1),
            )
            .map_err(|e| EventError::Transport(format!("invalid offset: {e}")))?;

        if let Err(e) = self.consumer.commit(&offsets, CommitMode::Async) {
            warn!(
                topic = %position.topic,
                partition = position.partition,
                offset = position.offset,
                error = %e,
                "failed to commit offset, message may be redelivered"
            );
        }

        Ok(())
    }

    async fn retry(&mut self, delivery: Delivery) -> Result<(), EventError> {
        self.retries.push_back(delivery.redelivered());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ids_are_per_host_and_stream() {
        let config = KafkaConfig {
            brokers: "localhost:9092".to_string(),
            group_prefix: "cart-validator".to_string(),
            hostname: "node-1".to_string(),
        };

        assert_eq!(
            config.group_id(EventStream::Products),
            "cart-validator-node-1-products"
        );
        assert_eq!(
            config.group_id(EventStream::Inventory),
            "cart-validator-node-1-inventory"
        );
    }
}
