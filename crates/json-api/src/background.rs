//! Background workers and event listeners owned by the server process.

use std::{sync::Arc, time::Duration};

use cartkeeper_app::{
    context::AppContext,
    events::{
        DeliverySource, EventListener, ListenerStats, MemoryPublisher, MemorySource,
        models::EventStream,
    },
    workers::{AbandonmentWorker, ExpirationWorker, ReconciliationWorker, WorkerError},
};
use thiserror::Error;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{info, warn};

#[cfg(feature = "kafka")]
use crate::config::events::EventsConfig;
use crate::config::{ServerConfig, events::EventTransport};

const MEMORY_CHANNEL_CAPACITY: usize = 1_024;

#[derive(Debug, Error)]
pub(crate) enum BackgroundError {
    #[error("failed to start worker: {0}")]
    Worker(#[from] WorkerError),

    #[cfg(feature = "kafka")]
    #[error("failed to connect event consumer: {0}")]
    Events(#[from] cartkeeper_app::events::EventError),

    #[cfg(not(feature = "kafka"))]
    #[error("kafka transport requested but this build has no kafka support")]
    KafkaUnavailable,
}

/// Cumulative counts across every worker and listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BackgroundTotals {
    pub carts_validated: u64,
    pub items_updated: u64,
    pub validation_errors: u64,
    pub carts_deleted: u64,
    pub items_expired: u64,
    pub abandoned_detected: u64,
    pub reminders_sent: u64,
    pub reminders_failed: u64,
    pub abandoned_expired: u64,
    pub events_handled: u64,
    pub events_retried: u64,
    pub events_dead_lettered: u64,
    pub carts_patched: u64,
}

impl BackgroundTotals {
    /// `(component, counter, value)` triples for export.
    pub(crate) fn samples(&self) -> [(&'static str, &'static str, u64); 13] {
        [
            ("reconciliation", "carts_validated", self.carts_validated),
            ("reconciliation", "items_updated", self.items_updated),
            ("reconciliation", "validation_errors", self.validation_errors),
            ("expiration", "carts_deleted", self.carts_deleted),
            ("expiration", "items_expired", self.items_expired),
            ("abandonment", "detected", self.abandoned_detected),
            ("abandonment", "reminders_sent", self.reminders_sent),
            ("abandonment", "reminders_failed", self.reminders_failed),
            ("abandonment", "expired", self.abandoned_expired),
            ("events", "handled", self.events_handled),
            ("events", "retried", self.events_retried),
            ("events", "dead_lettered", self.events_dead_lettered),
            ("events", "carts_patched", self.carts_patched),
        ]
    }

    fn absorb_listener(&mut self, stats: ListenerStats) {
        self.events_handled += stats.handled;
        self.events_retried += stats.retried;
        self.events_dead_lettered += stats.dead_lettered;
        self.carts_patched += stats.carts_patched;
    }
}

/// Workers run on their schedules, listeners run until told to stop.
pub(crate) struct Background {
    reconciliation: ReconciliationWorker,
    expiration: ExpirationWorker,
    abandonment: AbandonmentWorker,
    listeners: Vec<Arc<EventListener>>,
    stop_listeners: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Feeds in-memory sources from the ingest endpoint; empty for Kafka.
    publishers: Vec<MemoryPublisher>,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("listeners", &self.listeners.len())
            .field("publishers", &self.publishers.len())
            .finish_non_exhaustive()
    }
}

impl Background {
    /// Start every worker and one listener per event stream.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker cannot start or an event consumer
    /// cannot connect.
    pub(crate) async fn start(
        app: &AppContext,
        config: &ServerConfig,
    ) -> Result<Self, BackgroundError> {
        let background = Self::listen(app, config)?;

        background.reconciliation.start().await?;
        background.expiration.start().await?;
        background.abandonment.start().await?;

        Ok(background)
    }

    /// Build the workers without starting them and spawn one listener per
    /// event stream.
    fn listen(app: &AppContext, config: &ServerConfig) -> Result<Self, BackgroundError> {
        let reconciliation = ReconciliationWorker::new(
            Arc::clone(&app.carts),
            Arc::clone(&app.validator),
            config.workers.reconciliation(),
        );
        let expiration = ExpirationWorker::new(Arc::clone(&app.carts), config.workers.expiration());
        let abandonment = AbandonmentWorker::new(
            Arc::clone(&app.tenants),
            Arc::clone(&app.abandoned_carts),
            config.workers.abandonment(),
        );

        let (stop_listeners, shutdown) = watch::channel(false);

        let mut background = Self {
            reconciliation,
            expiration,
            abandonment,
            listeners: Vec::new(),
            stop_listeners,
            tasks: Mutex::new(Vec::new()),
            publishers: Vec::new(),
        };

        for stream in [EventStream::Products, EventStream::Inventory] {
            let listener = Arc::new(EventListener::new(
                Arc::clone(&app.events),
                Arc::clone(&app.dead_letters),
                config.events.listener(),
            ));

            let task = match config.events.events_transport {
                EventTransport::Memory => {
                    let (publisher, source) =
                        MemorySource::channel(stream, MEMORY_CHANNEL_CAPACITY);

                    background.publishers.push(publisher);

                    spawn_listener(Arc::clone(&listener), source, shutdown.clone())
                }
                #[cfg(feature = "kafka")]
                EventTransport::Kafka => spawn_listener(
                    Arc::clone(&listener),
                    connect_kafka(&config.events, stream)?,
                    shutdown.clone(),
                ),
                #[cfg(not(feature = "kafka"))]
                EventTransport::Kafka => return Err(BackgroundError::KafkaUnavailable),
            };

            background.tasks.get_mut().push(task);
            background.listeners.push(listener);

            info!(stream = %stream.as_str(), "event listener started");
        }

        Ok(background)
    }

    /// The in-memory publisher feeding `stream`, when events travel in
    /// process.
    pub(crate) fn publisher(&self, stream: EventStream) -> Option<&MemoryPublisher> {
        self.publishers
            .iter()
            .find(|publisher| publisher.stream() == stream)
    }

    pub(crate) async fn totals(&self) -> BackgroundTotals {
        let reconciliation = self.reconciliation.stats().await;
        let expiration = self.expiration.stats().await;
        let abandonment = self.abandonment.stats().await;

        let mut totals = BackgroundTotals {
            carts_validated: reconciliation.carts_validated,
            items_updated: reconciliation.items_updated,
            validation_errors: reconciliation.validation_errors,
            carts_deleted: expiration.carts_deleted,
            items_expired: expiration.items_expired,
            abandoned_detected: abandonment.detected,
            reminders_sent: abandonment.reminders_sent,
            reminders_failed: abandonment.reminders_failed,
            abandoned_expired: abandonment.expired,
            ..BackgroundTotals::default()
        };

        for listener in &self.listeners {
            totals.absorb_listener(listener.stats());
        }

        totals
    }

    /// Stop listeners and workers, waiting at most `deadline` for passes in
    /// flight.
    pub(crate) async fn stop(&self, deadline: Duration) {
        self.stop_listeners.send_replace(true);

        let drain = async {
            self.reconciliation.stop().await;
            self.expiration.stop().await;
            self.abandonment.stop().await;

            for task in self.tasks.lock().await.drain(..) {
                if let Err(error) = task.await {
                    warn!(%error, "event listener ended abnormally");
                }
            }
        };

        if timeout(deadline, drain).await.is_err() {
            warn!(
                deadline_ms = deadline.as_millis(),
                "background work did not stop before the deadline"
            );
        } else {
            info!("background work stopped");
        }
    }
}

fn spawn_listener<S>(
    listener: Arc<EventListener>,
    mut source: S,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: DeliverySource + 'static,
{
    tokio::spawn(async move { listener.run(&mut source, shutdown).await })
}

#[cfg(feature = "kafka")]
fn connect_kafka(
    config: &EventsConfig,
    stream: EventStream,
) -> Result<cartkeeper_app::events::kafka::KafkaSource, BackgroundError> {
    use cartkeeper_app::events::kafka::{KafkaConfig, KafkaSource};

    let kafka = KafkaConfig {
        brokers: config.kafka_brokers.clone(),
        group_prefix: config.kafka_group_prefix.clone(),
        hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
    };

    Ok(KafkaSource::connect(&kafka, stream)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as SyncMutex;

    use clap::Parser;
    use salvo::{affix_state::inject, prelude::*, test::TestClient};
    use serde_json::json;
    use testresult::TestResult;
    use tokio::sync::oneshot;

    use cartkeeper_app::{
        domain::{
            abandoned_carts::MockAbandonedCartsService,
            carts::{
                CartsService, MockCartsService,
                models::{CartItemStatus, CartItems},
                records::CartRecord,
            },
            catalog::MockProductGateway,
            customers::{MockCustomersService, records::CustomerUuid},
            tenants::MockTenantsService,
            validation::MockCartValidation,
        },
        events::{CartEventHandler, dead_letters::MockDeadLetterStore},
    };

    use crate::{
        router::events_router,
        state::State,
        test_helpers::{TEST_TENANT_UUID, make_cart, make_item},
    };

    use super::*;

    fn server_config() -> Result<ServerConfig, clap::Error> {
        ServerConfig::try_parse_from([
            "cartkeeper-json",
            "--database-url",
            "postgres://localhost/cartkeeper",
        ])
    }

    fn cart_record(product_id: &str) -> Result<CartRecord, serde_json::Error> {
        let cart = make_cart(CustomerUuid::new(), vec![make_item(product_id, 2_500, 1)]);

        Ok(CartRecord {
            uuid: cart.uuid,
            tenant_uuid: cart.tenant_uuid,
            customer_uuid: cart.customer_uuid,
            items: cart.items.to_document()?,
            subtotal: cart.subtotal,
            item_count: cart.item_count,
            has_unavailable_items: cart.has_unavailable_items,
            has_price_changes: cart.has_price_changes,
            unavailable_count: cart.unavailable_count,
            version: cart.version,
            last_item_change: cart.last_item_change,
            last_validated_at: cart.last_validated_at,
            expires_at: cart.expires_at,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    fn context(carts: MockCartsService) -> AppContext {
        let carts: Arc<dyn CartsService> = Arc::new(carts);

        let mut gateway = MockProductGateway::new();

        gateway.expect_invalidate().returning(|_, _| ());

        let gateway = Arc::new(gateway);

        AppContext {
            carts: Arc::clone(&carts),
            customers: Arc::new(MockCustomersService::new()),
            tenants: Arc::new(MockTenantsService::new()),
            products: gateway.clone(),
            validator: Arc::new(MockCartValidation::new()),
            abandoned_carts: Arc::new(MockAbandonedCartsService::new()),
            events: Arc::new(CartEventHandler::new(carts, gateway)),
            dead_letters: Arc::new(MockDeadLetterStore::new()),
        }
    }

    #[tokio::test]
    async fn ingested_product_event_patches_carts() -> TestResult {
        let record = cart_record("sku-1")?;
        let cart_uuid = record.uuid;

        let (saved_tx, saved_rx) = oneshot::channel::<CartItems>();
        let saved_tx = SyncMutex::new(Some(saved_tx));

        let mut carts = MockCartsService::new();

        carts
            .expect_find_carts_with_product()
            .withf(|tenant, product| *tenant == TEST_TENANT_UUID && product == "sku-1")
            .return_once(move |_, _| Ok(vec![record]));

        carts
            .expect_save_items()
            .withf(move |_, cart, version, _, _| *cart == cart_uuid && *version == 1)
            .times(1)
            .returning(move |_, _, _, items, _| {
                if let Some(sender) = saved_tx.lock().ok().and_then(|mut tx| tx.take()) {
                    assert!(sender.send(items.clone()).is_ok(), "test still waiting");
                }

                Ok(make_cart(CustomerUuid::new(), items.into_vec()))
            });

        let app = context(carts);
        let background = Arc::new(Background::listen(&app, &server_config()?)?);

        let service = Service::new(
            Router::new()
                .hoop(inject(Arc::new(State::new(app, Some(Arc::clone(&background))))))
                .push(events_router()),
        );

        let res = TestClient::post("http://example.com/events/products")
            .json(&json!({
                "eventType": "product.deleted",
                "tenantId": TEST_TENANT_UUID.to_string(),
                "productId": "sku-1",
            }))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::ACCEPTED));

        let saved = timeout(Duration::from_secs(5), saved_rx).await??;

        assert_eq!(
            saved.iter().map(|item| item.status).collect::<Vec<_>>(),
            vec![CartItemStatus::Unavailable]
        );

        background.stop(Duration::from_secs(1)).await;

        assert_eq!(background.totals().await.carts_patched, 1);

        Ok(())
    }

    #[test]
    fn listener_stats_are_summed() {
        let mut totals = BackgroundTotals::default();

        totals.absorb_listener(ListenerStats {
            handled: 3,
            retried: 1,
            dead_lettered: 0,
            carts_patched: 5,
        });
        totals.absorb_listener(ListenerStats {
            handled: 2,
            retried: 0,
            dead_lettered: 1,
            carts_patched: 1,
        });

        assert_eq!(totals.events_handled, 5);
        assert_eq!(totals.events_dead_lettered, 1);
        assert_eq!(totals.carts_patched, 6);
    }

    #[test]
    fn every_counter_is_exported_once() {
        let samples = BackgroundTotals::default().samples();
        let mut names: Vec<_> = samples
            .iter()
            .map(|(component, counter, _)| format!("{component}.{counter}"))
            .collect();

        names.sort();
        names.dedup();

        assert_eq!(names.len(), samples.len());
    }
}
