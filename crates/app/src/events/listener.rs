//! Event listener.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, time::timeout};
use tracing::{debug, error, info, warn};

use crate::events::{
    dead_letters::{DeadLetterStore, FailedEvent},
    errors::EventError,
    handlers::EventHandler,
    models::tenant_of,
    source::{Delivery, DeliverySource},
};

/// Pause after a transport error before polling again.
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Deliveries allowed per message, the first included.
    pub max_deliver: u32,

    /// How long a handler may run before the delivery counts as failed.
    pub ack_wait: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_deliver: 3,
            ack_wait: Duration::from_secs(30),
        }
    }
}

/// What became of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled { carts: usize },
    Retried,
    DeadLettered,
}

#[derive(Debug, Default)]
struct Counters {
    handled: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
    carts_patched: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub handled: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    pub carts_patched: u64,
}

pub struct EventListener {
    handler: Arc<dyn EventHandler>,
    dead_letters: Arc<dyn DeadLetterStore>,
    config: ListenerConfig,
    counters: Counters,
}

impl EventListener {
    #[must_use]
    pub fn new(
        handler: Arc<dyn EventHandler>,
        dead_letters: Arc<dyn DeadLetterStore>,
        config: ListenerConfig,
    ) -> Self {
        Self {
            handler,
            dead_letters,
            config,
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> ListenerStats {
        ListenerStats {
            handled: self.counters.handled.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
            carts_patched: self.counters.carts_patched.load(Ordering::Relaxed),
        }
    }

    /// Consume `source` until it closes or `shutdown` flips to `true`.
    pub async fn run<S: DeliverySource>(&self, source: &mut S, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }

                    continue;
                }
                next = source.next() => next,
            };

            let Some(next) = next else {
                info!("event source closed");

                break;
            };

            match next {
                Ok(delivery) => {
                    if let Err(error) = self.process(source, delivery).await {
                        error!(error = %error, "failed to settle event delivery");
                    }
                }
                Err(error) => {
                    warn!(error = %error, "failed to receive event");

                    tokio::time::sleep(TRANSPORT_BACKOFF).await;
                }
            }
        }
    }

    /// Handle one delivery and settle it with the source: acknowledge it,
    /// hand it back for redelivery or park it as a dead letter.
    ///
    /// # Errors
    ///
    /// Returns an error when the delivery could not be settled. The message
    /// is then neither acknowledged nor parked.
    pub async fn process<S: DeliverySource>(
        &self,
        source: &mut S,
        delivery: Delivery,
    ) -> Result<Outcome, EventError> {
        let result = timeout(
            self.config.ack_wait,
            self.handler.handle(delivery.stream, &delivery.payload),
        )
        .await
        .unwrap_or(Err(EventError::Timeout(self.config.ack_wait)));

        let error = match result {
            Ok(carts) => {
                source.ack(&delivery).await?;

                self.counters.handled.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .carts_patched
                    .fetch_add(carts as u64, Ordering::Relaxed);

                debug!(
                    stream = %delivery.stream,
                    subject = %delivery.subject,
                    carts,
                    "handled event"
                );

                return Ok(Outcome::Handled { carts });
            }
            Err(error) => error,
        };

        if error.is_retryable() && delivery.attempt < self.config.max_deliver {
            warn!(
                stream = %delivery.stream,
                subject = %delivery.subject,
                attempt = delivery.attempt,
                error = %error,
                "event handler failed, redelivering"
            );

            source.retry(delivery).await?;

            self.counters.retried.fetch_add(1, Ordering::Relaxed);

            return Ok(Outcome::Retried);
        }

        let id = self
            .dead_letters
            .record(FailedEvent {
                stream: delivery.stream,
                subject: delivery.subject.clone(),
                tenant_uuid: tenant_of(&delivery.payload),
                payload: delivery.payload.clone(),
                error_message: error.to_string(),
                attempts: delivery.attempt,
            })
            .await?;

        source.ack(&delivery).await?;

        self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);

        warn!(
            stream = %delivery.stream,
            subject = %delivery.subject,
            attempt = delivery.attempt,
            dead_letter = id,
            error = %error,
            "event parked as dead letter"
        );

        Ok(Outcome::DeadLettered)
    }
}
