//! # Queue Manager
//!
//! Owns exactly one driver and puts a connectivity check in front of every
//! push and pop. Drivers never sleep; the manager applies the fixed backoff.

use std::time::Duration;
use tracing::{debug, warn};

use super::provider::QueueProvider;
use super::traits::{Delivery, QueueDriver, ReceiptHandle};
use super::QueueError;
use crate::config::QueueConfig;
use crate::constants::DISCONNECTED_POP_BACKOFF;
use crate::updates::Update;

#[derive(Debug)]
pub struct QueueManager<D: QueueDriver = QueueProvider> {
    driver: D,
    backoff: Duration,
}

impl QueueManager<QueueProvider> {
    pub async fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        let provider = QueueProvider::from_config(config).await?;
        debug!(backend = provider.provider_name(), "Queue manager initialized");
        Ok(Self::new(provider))
    }
}

impl<D: QueueDriver> QueueManager<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            backoff: DISCONNECTED_POP_BACKOFF,
        }
    }

    /// Override the disconnected-pop backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn backend(&self) -> &'static str {
        self.driver.driver_name()
    }

    /// `false` without touching the driver when the backend is down.
    pub async fn push(&self, update: &Update) -> bool {
        if !self.driver.is_connected().await {
            warn!(backend = self.backend(), "Queue backend not connected, push skipped");
            return false;
        }
        self.driver.push(update).await
    }

    /// Sleeps for the backoff and returns `None` when the backend is down.
    pub async fn pop(&self) -> Option<Update> {
        if !self.gate_receive().await {
            return None;
        }
        self.driver.pop().await
    }

    /// Like [`pop`](Self::pop), but leaves a deferred acknowledgment to the
    /// caller when the driver is configured that way.
    pub async fn receive(&self) -> Option<Delivery> {
        if !self.gate_receive().await {
            return None;
        }
        self.driver.receive().await
    }

    pub async fn ack(&self, receipt: ReceiptHandle) -> bool {
        self.driver.ack(receipt).await
    }

    pub async fn count(&self) -> usize {
        self.driver.count().await
    }

    pub async fn is_connected(&self) -> bool {
        self.driver.is_connected().await
    }

    async fn gate_receive(&self) -> bool {
        if self.driver.is_connected().await {
            return true;
        }
        warn!(
            backend = self.backend(),
            backoff_ms = self.backoff.as_millis() as u64,
            "Queue backend not connected, backing off"
        );
        tokio::time::sleep(self.backoff).await;
        false
    }
}
