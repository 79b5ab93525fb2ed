//! # In-Memory Queue
//!
//! Process-local FIFO for tests and local development. Items are stored
//! encoded, exactly as a network backend would hold them, so codec behavior
//! is exercised on every push/pop. Clones share the same storage.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::messaging::codec;
use crate::messaging::traits::{Delivery, QueueDriver};
use crate::messaging::QueueError;
use crate::updates::Update;

const DRIVER: &str = "memory";

#[derive(Debug)]
struct Inner {
    messages: Mutex<VecDeque<Vec<u8>>>,
    connected: AtomicBool,
    /// Push/pop/count calls that reached the storage
    operations: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                messages: Mutex::new(VecDeque::new()),
                connected: AtomicBool::new(true),
                operations: AtomicU64::new(0),
            }),
        }
    }

    /// Simulate losing or regaining the backend.
    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    pub fn operations(&self) -> u64 {
        self.inner.operations.load(Ordering::SeqCst)
    }

    fn check_connected(&self) -> Result<(), QueueError> {
        if self.inner.connected.load(Ordering::SeqCst) {
            self.inner.operations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            Err(QueueError::disconnected(DRIVER))
        }
    }

    pub fn try_push(&self, update: &Update) -> Result<(), QueueError> {
        self.check_connected()?;
        let bytes = codec::encode(update)?;
        self.inner.messages.lock().push_back(bytes);
        Ok(())
    }

    pub fn try_pop(&self) -> Result<Option<Update>, QueueError> {
        self.check_connected()?;
        let item = self.inner.messages.lock().pop_front();
        item.map(|bytes| codec::decode(&bytes)).transpose()
    }

    pub fn try_count(&self) -> Result<usize, QueueError> {
        self.check_connected()?;
        Ok(self.inner.messages.lock().len())
    }
}

#[async_trait]
impl QueueDriver for InMemoryQueue {
    fn driver_name(&self) -> &'static str {
        DRIVER
    }

    async fn push(&self, update: &Update) -> bool {
        match self.try_push(update) {
            Ok(()) => true,
            Err(e) => {
                warn!(driver = DRIVER, error = %e, "Failed to push to in-memory queue");
                false
            }
        }
    }

    async fn receive(&self) -> Option<Delivery> {
        match self.try_pop() {
            Ok(update) => update.map(Delivery::settled),
            Err(e) => {
                warn!(driver = DRIVER, error = %e, "Failed to pop from in-memory queue");
                None
            }
        }
    }

    async fn count(&self) -> usize {
        self.try_count().unwrap_or(0)
    }

    async fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fifo_and_shared_storage() {
        let producer = InMemoryQueue::new();
        let consumer = producer.clone();

        for id in 1..=3 {
            assert!(producer.push(&Update::from_value(json!({"update_id": id})).unwrap()).await);
        }
        assert_eq!(consumer.count().await, 3);

        let ids: Vec<i64> = [
            consumer.pop().await,
            consumer.pop().await,
            consumer.pop().await,
        ]
        .into_iter()
        .map(|u| u.unwrap().update_id().unwrap())
        .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(consumer.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnected_queue_degrades() {
        let queue = InMemoryQueue::new();
        queue.set_connected(false);

        assert!(!queue.is_connected().await);
        assert!(!queue.push(&Update::default()).await);
        assert!(queue.pop().await.is_none());
        assert_eq!(queue.operations(), 0);
    }
}
