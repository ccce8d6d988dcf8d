//! Delivery sources.
//!
//! A source hands out messages one at a time. Each delivered message must be
//! either acknowledged, after which it is never seen again, or returned for
//! redelivery with [`DeliverySource::retry`].

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::{errors::EventError, models::EventStream};

/// Position of a message in a partitioned log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// One delivery of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub stream: EventStream,
    pub subject: String,
    pub payload: Vec<u8>,

    /// 1-based delivery count.
    pub attempt: u32,

    /// Where the message sits in the broker's log, for sources that commit
    /// offsets.
    pub position: Option<LogPosition>,
}

impl Delivery {
    #[must_use]
    pub fn new(stream: EventStream, subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            stream,
            subject: subject.into(),
            payload,
            attempt: 1,
            position: None,
        }
    }

    /// The same message, delivered once more.
    #[must_use]
    pub fn redelivered(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

#[async_trait]
pub trait DeliverySource: Send {
    /// The next message, or `None` once the source is closed.
    async fn next(&mut self) -> Option<Result<Delivery, EventError>>;

    /// Mark a message as handled.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), EventError>;

    /// Hand a message back for another delivery.
    async fn retry(&mut self, delivery: Delivery) -> Result<(), EventError>;
}

/// Publishes into an in-memory source.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    stream: EventStream,
    sender: mpsc::Sender<Delivery>,
}

impl MemoryPublisher {
    #[must_use]
    pub fn stream(&self) -> EventStream {
        self.stream
    }

    /// Publish a raw payload. Returns `false` when the source is gone.
    pub async fn publish(&self, subject: &str, payload: Vec<u8>) -> bool {
        self.sender
            .send(Delivery::new(self.stream, subject, payload))
            .await
            .is_ok()
    }

    /// Publish a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be serialised.
    pub async fn publish_json<T: serde::Serialize + Sync>(
        &self,
        subject: &str,
        value: &T,
    ) -> Result<bool, EventError> {
        Ok(self.publish(subject, serde_json::to_vec(value)?).await)
    }
}

/// Channel-backed source for tests and single-node runs. Retried messages are
/// redelivered before new ones.
#[derive(Debug)]
pub struct MemorySource {
    receiver: mpsc::Receiver<Delivery>,
    retries: VecDeque<Delivery>,
    acked: u64,
    last_acked: Option<Delivery>,
}

impl MemorySource {
    /// Create a source and the publisher feeding it.
    #[must_use]
    pub fn channel(stream: EventStream, capacity: usize) -> (MemoryPublisher, Self) {
        let (sender, receiver) = mpsc::channel(capacity);

        (
            MemoryPublisher { stream, sender },
            Self {
                receiver,
                retries: VecDeque::new(),
                acked: 0,
                last_acked: None,
            },
        )
    }

    /// Number of messages acknowledged so far.
    #[must_use]
    pub fn acked(&self) -> u64 {
        self.acked
    }

    /// The most recently acknowledged message.
    #[must_use]
    pub fn last_acked(&self) -> Option<&Delivery> {
        self.last_acked.as_ref()
    }
}

#[async_trait]
impl DeliverySource for MemorySource {
    async fn next(&mut self) -> Option<Result<Delivery, EventError>> {
        if let Some(delivery) = self.retries.pop_front() {
            return Some(Ok(delivery));
        }

        self.receiver.recv().await.map(Ok)
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), EventError> {
        self.acked += 1;
        self.last_acked = Some(delivery.clone());

        Ok(())
    }

    async fn retry(&mut self, delivery: Delivery) -> Result<(), EventError> {
        self.retries.push_back(delivery.redelivered());

        Ok(())
    }
}
