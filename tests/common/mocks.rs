//! Test doubles shared by the integration tests.

use async_trait::async_trait;
use courier_core::client::{BotApi, TransportError};
use courier_core::messaging::{Delivery, InMemoryQueue, QueueDriver, ReceiptHandle};
use courier_core::registry::{HandlerDescriptor, HandlerError};
use courier_core::updates::{Update, UpdateKind};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Bot API that records every call and serves scripted `getUpdates` batches.
#[derive(Default)]
pub struct RecordingApi {
    batches: Mutex<VecDeque<Vec<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_batch(batch: Vec<Value>) -> Arc<Self> {
        let api = Self::default();
        api.batches.lock().push_back(batch);
        Arc::new(api)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

#[async_trait]
impl BotApi for RecordingApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.calls.lock().push((method.to_string(), params));
        match method {
            "getUpdates" => Ok(Value::Array(
                self.batches.lock().pop_front().unwrap_or_default(),
            )),
            "sendMessage" => Ok(json!({"message_id": 1})),
            _ => Ok(Value::Bool(true)),
        }
    }
}

/// Shared, ordered record of `handler.hook` invocations.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A handler that records `before`, `onMessage` and `after`.
pub fn recording_handler(name: &'static str, priority: i32, log: &CallLog) -> HandlerDescriptor {
    let (b, m, a) = (log.clone(), log.clone(), log.clone());
    HandlerDescriptor::builder(name)
        .priority(priority)
        .before(move |_, _| {
            let log = b.clone();
            async move {
                log.lock().push(format!("{name}.before"));
                Ok::<_, HandlerError>(())
            }
        })
        .on(UpdateKind::Message, move |_, _| {
            let log = m.clone();
            async move {
                log.lock().push(format!("{name}.onMessage"));
                Ok::<_, HandlerError>(())
            }
        })
        .after(move |_, _| {
            let log = a.clone();
            async move {
                log.lock().push(format!("{name}.after"));
                Ok::<_, HandlerError>(())
            }
        })
        .build()
        .expect("recording handler has a priority")
}

/// In-memory queue that defers acknowledgment, as the broker does with the
/// after-process policy. Unacknowledged deliveries can be redelivered.
#[derive(Debug, Default, Clone)]
pub struct DeferredAckQueue {
    inner: InMemoryQueue,
    in_flight: Arc<Mutex<Vec<(ReceiptHandle, Update)>>>,
    acked: Arc<Mutex<Vec<ReceiptHandle>>>,
    next_tag: Arc<Mutex<u64>>,
}

impl DeferredAckQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acked(&self) -> Vec<ReceiptHandle> {
        self.acked.lock().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

#[async_trait]
impl QueueDriver for DeferredAckQueue {
    fn driver_name(&self) -> &'static str {
        "deferred"
    }

    async fn push(&self, update: &Update) -> bool {
        self.inner.push(update).await
    }

    async fn receive(&self) -> Option<Delivery> {
        let update = self.inner.pop().await?;
        let receipt = {
            let mut tag = self.next_tag.lock();
            *tag += 1;
            ReceiptHandle::new(*tag)
        };
        self.in_flight.lock().push((receipt, update.clone()));
        Some(Delivery::pending(update, receipt))
    }

    async fn ack(&self, receipt: ReceiptHandle) -> bool {
        let mut in_flight = self.in_flight.lock();
        let before = in_flight.len();
        in_flight.retain(|(r, _)| *r != receipt);
        if in_flight.len() == before {
            return false;
        }
        self.acked.lock().push(receipt);
        true
    }

    async fn count(&self) -> usize {
        self.inner.count().await + self.in_flight.lock().len()
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }
}

pub fn update(value: Value) -> Update {
    Update::from_value(value).expect("test update is an object")
}

pub fn message_update(update_id: i64, text: &str) -> Update {
    update(json!({
        "update_id": update_id,
        "message": {"message_id": update_id, "text": text, "from": {"id": 1}, "chat": {"id": 1}}
    }))
}
