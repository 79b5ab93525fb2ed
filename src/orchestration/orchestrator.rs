//! # Orchestrator
//!
//! Runs one of the three modes over an explicit set of services built at
//! startup: a queue manager, a dispatcher and the transport client.
//!
//! Poll mode persists the offset after each update it has handled, so an
//! interrupted batch is refetched from the first unhandled update. When
//! dispatching inline the offset advances regardless of handler outcomes;
//! when enqueueing, a failed push stops the batch without advancing.

use futures::FutureExt;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::offset_store::OffsetStore;
use super::run_mode::Route;
use crate::client::{BotApi, GetUpdates};
use crate::config::{AppConfig, PollingConfig};
use crate::constants::{WORKER_IDLE_DELAY, WORKER_RECONNECT_DELAY};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::{CourierError, Result};
use crate::handlers::builtin_catalog;
use crate::logging::{log_error, log_queue_operation};
use crate::messaging::{QueueDriver, QueueManager, QueueProvider};
use crate::registry::HandlerRegistry;
use crate::updates::Update;

/// What happened to one inbound update.
#[derive(Debug)]
pub enum Disposition {
    Dispatched(DispatchReport),
    Enqueued,
    /// The push was refused or failed; the update was not stored
    NotEnqueued,
}

/// Outcome of one poll batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub fetched: usize,
    pub handled: usize,
    /// Offset persisted after the batch
    pub offset: i64,
    pub hook_failures: usize,
}

/// Outcome of one worker loop iteration.
#[derive(Debug)]
pub enum WorkerStep {
    /// Backend unreachable; slept for the reconnect delay
    Disconnected,
    /// Nothing to pop; slept for the idle delay
    Idle,
    Dispatched(DispatchReport),
}

pub struct Orchestrator<D: QueueDriver = QueueProvider> {
    queue: QueueManager<D>,
    dispatcher: Dispatcher,
    client: Arc<dyn BotApi>,
    polling: PollingConfig,
    offsets: OffsetStore,
}

impl<D: QueueDriver> std::fmt::Debug for Orchestrator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.queue.backend())
            .field("offsets", &self.offsets)
            .finish_non_exhaustive()
    }
}

impl Orchestrator<QueueProvider> {
    /// Build every service from configuration, with the built-in handler
    /// catalog.
    pub async fn from_config(config: &AppConfig, client: Arc<dyn BotApi>) -> Result<Self> {
        let queue = QueueManager::from_config(&config.queue).await?;
        let registry = Arc::new(HandlerRegistry::from_config(
            &config.handlers,
            builtin_catalog(),
        ));
        let dispatcher = Dispatcher::new(registry, Arc::clone(&client));
        Ok(Self::new(queue, dispatcher, client, config.polling.clone()))
    }
}

impl<D: QueueDriver> Orchestrator<D> {
    pub fn new(
        queue: QueueManager<D>,
        dispatcher: Dispatcher,
        client: Arc<dyn BotApi>,
        polling: PollingConfig,
    ) -> Self {
        let offsets = OffsetStore::new(&polling.state_file);
        Self {
            queue,
            dispatcher,
            client,
            polling,
            offsets,
        }
    }

    pub fn queue(&self) -> &QueueManager<D> {
        &self.queue
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn offsets(&self) -> &OffsetStore {
        &self.offsets
    }

    /// Handle the single inbound update of a webhook invocation.
    pub async fn run_webhook(&self, update: Update, route: Route) -> Disposition {
        debug!(update_id = ?update.update_id(), ?route, "Handling webhook update");
        self.handle(&update, route).await
    }

    /// Fetch one batch from the persisted offset and handle it in order.
    pub async fn run_poll(&self, route: Route) -> Result<PollSummary> {
        let offset = self.offsets.load().await?;
        let request = GetUpdates {
            offset,
            limit: self.polling.limit,
            timeout: self.polling.timeout,
            allowed_updates: self.polling.allowed_updates.clone(),
        };

        let updates = self.client.get_updates(&request).await?;
        if !updates.is_empty() {
            info!(count = updates.len(), offset, "Fetched updates");
        }

        let mut summary = PollSummary {
            fetched: updates.len(),
            offset,
            ..Default::default()
        };

        for update in &updates {
            match self.handle(update, route).await {
                Disposition::NotEnqueued => {
                    warn!(
                        update_id = ?update.update_id(),
                        remaining = summary.fetched - summary.handled,
                        "Stopping batch, remaining updates will be fetched again"
                    );
                    break;
                }
                Disposition::Dispatched(report) => {
                    summary.hook_failures += report.failures().count();
                }
                Disposition::Enqueued => {}
            }
            summary.handled += 1;

            match update.update_id().map(|id| (id, id.checked_add(1))) {
                Some((_, Some(next))) => {
                    summary.offset = next;
                    self.offsets.save(summary.offset).await?;
                }
                Some((id, None)) => {
                    warn!(update_id = id, "update_id has no successor, offset not advanced")
                }
                None => warn!(
                    update_id = ?update.get("update_id"),
                    "Update has no usable update_id, offset not advanced"
                ),
            }
        }

        Ok(summary)
    }

    /// Pop and dispatch until the process is stopped.
    pub async fn run_worker(&self) {
        self.run_worker_until(std::future::pending::<()>()).await;
    }

    /// Like [`run_worker`](Self::run_worker), returning once `shutdown`
    /// completes. Shutdown is observed between iterations, never during a
    /// dispatch.
    pub async fn run_worker_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(backend = self.queue.backend(), "Queue worker started");
        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                info!(backend = self.queue.backend(), "Queue worker stopping");
                return;
            }
            self.worker_step().await;
        }
    }

    /// One worker iteration: connectivity check, pop, dispatch, ack.
    pub async fn worker_step(&self) -> WorkerStep {
        if !self.queue.is_connected().await {
            warn!(
                backend = self.queue.backend(),
                "Queue connection lost, retrying"
            );
            sleep(WORKER_RECONNECT_DELAY).await;
            return WorkerStep::Disconnected;
        }

        let Some(delivery) = self.queue.receive().await else {
            sleep(WORKER_IDLE_DELAY).await;
            return WorkerStep::Idle;
        };

        let report = self.dispatcher.dispatch(&delivery.update).await;
        if let Some(receipt) = delivery.receipt {
            if !self.queue.ack(receipt).await {
                warn!(
                    backend = self.queue.backend(),
                    tag = receipt.tag(),
                    "Acknowledgment failed, the item may be delivered again"
                );
            }
        }
        WorkerStep::Dispatched(report)
    }

    async fn handle(&self, update: &Update, route: Route) -> Disposition {
        match route {
            Route::Dispatch => Disposition::Dispatched(self.dispatcher.dispatch(update).await),
            Route::Enqueue => {
                let update_id = update.update_id().map(|id| id.to_string());
                if self.queue.push(update).await {
                    log_queue_operation("push", self.queue.backend(), "queued", update_id.as_deref());
                    Disposition::Enqueued
                } else {
                    log_error(
                        "orchestrator",
                        "enqueue",
                        "cannot save update to queue",
                        update_id.as_deref(),
                    );
                    Disposition::NotEnqueued
                }
            }
        }
    }
}

/// Read the webhook's inbound buffer: one JSON object.
pub fn read_inbound_update<R: Read>(mut reader: R) -> Result<Update> {
    let mut body = String::new();
    reader.read_to_string(&mut body)?;
    if body.trim().is_empty() {
        return Err(CourierError::malformed_item("inbound update is empty"));
    }
    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| CourierError::malformed_item(format!("inbound update is not JSON: {e}")))?;
    Update::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use crate::messaging::InMemoryQueue;
    use crate::registry::{HandlerDescriptor, HandlerError};
    use crate::updates::UpdateKind;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedApi {
        batch: Vec<Value>,
        requests: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl BotApi for ScriptedApi {
        async fn call(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError> {
            match method {
                "getUpdates" => {
                    self.requests.lock().push(params);
                    Ok(Value::Array(self.batch.clone()))
                }
                _ => Ok(Value::Bool(true)),
            }
        }
    }

    fn failing_handler() -> HandlerDescriptor {
        HandlerDescriptor::builder("failing")
            .priority(1)
            .on(UpdateKind::Message, |_, _| async {
                Err::<(), _>(HandlerError::new("handler refused"))
            })
            .build()
            .unwrap()
    }

    fn polling(dir: &Path) -> PollingConfig {
        PollingConfig {
            state_file: dir.join("lastupdate.txt"),
            limit: 50,
            timeout: 30,
            allowed_updates: Some(vec!["message".into()]),
        }
    }

    fn orchestrator(
        dir: &Path,
        queue: InMemoryQueue,
        api: Arc<ScriptedApi>,
    ) -> Orchestrator<InMemoryQueue> {
        let registry = Arc::new(HandlerRegistry::with_handlers(
            vec![failing_handler()],
            Duration::from_secs(60),
        ));
        let dispatcher = Dispatcher::new(registry, api.clone());
        Orchestrator::new(QueueManager::new(queue), dispatcher, api, polling(dir))
    }

    fn batch() -> Vec<Value> {
        (101..=103)
            .map(|id| json!({"update_id": id, "message": {"text": "hi", "from": {"id": 1}}}))
            .collect()
    }

    #[tokio::test]
    async fn test_poll_advances_offset_despite_handler_failures() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedApi {
            batch: batch(),
            ..Default::default()
        });
        let orchestrator = orchestrator(dir.path(), InMemoryQueue::new(), api.clone());

        let summary = orchestrator.run_poll(Route::Dispatch).await.unwrap();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.handled, 3);
        assert_eq!(summary.hook_failures, 3);
        assert_eq!(summary.offset, 104);
        assert_eq!(orchestrator.offsets().load().await.unwrap(), 104);
        assert_eq!(
            api.requests.lock()[0],
            json!({"offset": 0, "limit": 50, "timeout": 30, "allowed_updates": ["message"]})
        );
    }

    #[tokio::test]
    async fn test_poll_keeps_offset_when_update_id_cannot_advance() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedApi {
            batch: vec![
                json!({"update_id": i64::MAX, "message": {"text": "hi", "from": {"id": 1}}}),
                json!({"update_id": u64::MAX, "message": {"text": "hi", "from": {"id": 1}}}),
            ],
            ..Default::default()
        });
        let orchestrator = orchestrator(dir.path(), InMemoryQueue::new(), api);
        orchestrator.offsets().save(7).await.unwrap();

        let summary = orchestrator.run_poll(Route::Dispatch).await.unwrap();

        assert_eq!(summary.handled, 2);
        assert_eq!(summary.offset, 7);
        assert_eq!(orchestrator.offsets().load().await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_enqueue_stops_when_queue_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let queue = InMemoryQueue::new();
        queue.set_connected(false);
        let api = Arc::new(ScriptedApi {
            batch: batch(),
            ..Default::default()
        });
        let orchestrator = orchestrator(dir.path(), queue, api);
        orchestrator.offsets().save(101).await.unwrap();

        let summary = orchestrator.run_poll(Route::Enqueue).await.unwrap();

        assert_eq!(summary.handled, 0);
        assert_eq!(orchestrator.offsets().load().await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_webhook_enqueue_then_worker_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let queue = InMemoryQueue::new();
        let orchestrator = orchestrator(dir.path(), queue.clone(), Arc::new(ScriptedApi::default()));
        let update = Update::from_value(batch().remove(0)).unwrap();

        let disposition = orchestrator.run_webhook(update, Route::Enqueue).await;
        assert!(matches!(disposition, Disposition::Enqueued));
        assert_eq!(orchestrator.queue().count().await, 1);

        match orchestrator.worker_step().await {
            WorkerStep::Dispatched(report) => {
                assert_eq!(report.update_id, Some(101));
                assert_eq!(report.failures().count(), 1);
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(orchestrator.queue().count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_idle_and_disconnected_steps() {
        let dir = tempfile::tempdir().unwrap();
        let queue = InMemoryQueue::new();
        let orchestrator = orchestrator(dir.path(), queue.clone(), Arc::new(ScriptedApi::default()));

        let started = tokio::time::Instant::now();
        assert!(matches!(orchestrator.worker_step().await, WorkerStep::Idle));
        assert_eq!(started.elapsed(), WORKER_IDLE_DELAY);

        queue.set_connected(false);
        let started = tokio::time::Instant::now();
        assert!(matches!(orchestrator.worker_step().await, WorkerStep::Disconnected));
        assert_eq!(started.elapsed(), WORKER_RECONNECT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), InMemoryQueue::new(), Arc::new(ScriptedApi::default()));

        orchestrator
            .run_worker_until(sleep(Duration::from_millis(350)))
            .await;
    }

    #[test]
    fn test_read_inbound_update() {
        let update = read_inbound_update(r#"{"update_id": 5, "message": {"text": "a/b ✓"}}"#.as_bytes()).unwrap();
        assert_eq!(update.update_id(), Some(5));

        for body in ["", "   ", "not json", "[1, 2]"] {
            assert!(
                matches!(read_inbound_update(body.as_bytes()), Err(CourierError::MalformedItem { .. })),
                "{body:?}"
            );
        }
    }
}
