//! # Queue Driver Contract
//!
//! The capability set every backend implements: `push`, `pop`, `count` and
//! `is_connected`. None of these return errors. A driver that cannot reach
//! its backend logs a warning and answers `false`, `None` or `0`; backoff is
//! the caller's job.

use async_trait::async_trait;

use crate::updates::Update;

/// Broker-side handle for a delivery that has not been acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(u64);

impl ReceiptHandle {
    pub fn new(tag: u64) -> Self {
        Self(tag)
    }

    pub fn tag(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ReceiptHandle {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

/// One received item. `receipt` is `Some` only when the driver defers
/// acknowledgment to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub update: Update,
    pub receipt: Option<ReceiptHandle>,
}

impl Delivery {
    /// An item that is already removed from the backend.
    pub fn settled(update: Update) -> Self {
        Self {
            update,
            receipt: None,
        }
    }

    pub fn pending(update: Update, receipt: ReceiptHandle) -> Self {
        Self {
            update,
            receipt: Some(receipt),
        }
    }
}

#[async_trait]
pub trait QueueDriver: Send + Sync {
    /// Backend name for logging
    fn driver_name(&self) -> &'static str;

    /// Make `update` visible to a later `pop` by any consumer of the backend.
    async fn push(&self, update: &Update) -> bool;

    /// Take at most one item. Acknowledgment may be deferred to the caller
    /// through [`Delivery::receipt`].
    async fn receive(&self) -> Option<Delivery>;

    /// Acknowledge a deferred delivery.
    async fn ack(&self, _receipt: ReceiptHandle) -> bool {
        true
    }

    /// Reject a deferred delivery, optionally returning it to the queue.
    async fn nack(&self, _receipt: ReceiptHandle, _requeue: bool) -> bool {
        true
    }

    /// Remove and return one item. Removal is part of the same operation:
    /// a deferred receipt is acknowledged before returning.
    async fn pop(&self) -> Option<Update> {
        let delivery = self.receive().await?;
        if let Some(receipt) = delivery.receipt {
            self.ack(receipt).await;
        }
        Some(delivery.update)
    }

    /// Best-effort item count.
    async fn count(&self) -> usize;

    /// Liveness probe, cheap enough to call before every operation.
    async fn is_connected(&self) -> bool;
}
