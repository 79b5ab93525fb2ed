//! # Queue Provider Enum
//!
//! Enum dispatch over the concrete drivers, selected once from
//! configuration.

use async_trait::async_trait;

use super::providers::{FileQueue, InMemoryQueue, RabbitMqQueue, RedisQueue};
use super::traits::{Delivery, QueueDriver, ReceiptHandle};
use super::QueueError;
use crate::config::{QueueBackend, QueueConfig};
use crate::updates::Update;

#[derive(Debug)]
pub enum QueueProvider {
    /// One JSON file per item
    File(FileQueue),
    /// Redis list (strict FIFO)
    Redis(RedisQueue),
    /// Durable RabbitMQ queue
    RabbitMq(RabbitMqQueue),
    /// Process-local, non-durable
    InMemory(InMemoryQueue),
}

impl QueueProvider {
    /// Build the driver named by the configuration. Network drivers that
    /// cannot connect come back disconnected rather than failing.
    pub async fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        Ok(match config.backend {
            QueueBackend::Json => {
                let queue = FileQueue::new(&config.directory);
                queue.ensure_directory()?;
                Self::File(queue)
            }
            QueueBackend::Redis => Self::Redis(RedisQueue::connect(&config.redis).await),
            QueueBackend::RabbitMq => Self::RabbitMq(RabbitMqQueue::connect(&config.rabbitmq).await),
            QueueBackend::Memory => Self::InMemory(InMemoryQueue::new()),
        })
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::File(q) => q.driver_name(),
            Self::Redis(q) => q.driver_name(),
            Self::RabbitMq(q) => q.driver_name(),
            Self::InMemory(q) => q.driver_name(),
        }
    }
}

#[async_trait]
impl QueueDriver for QueueProvider {
    fn driver_name(&self) -> &'static str {
        self.provider_name()
    }

    async fn push(&self, update: &Update) -> bool {
        match self {
            Self::File(q) => q.push(update).await,
            Self::Redis(q) => q.push(update).await,
            Self::RabbitMq(q) => q.push(update).await,
            Self::InMemory(q) => q.push(update).await,
        }
    }

    async fn receive(&self) -> Option<Delivery> {
        match self {
            Self::File(q) => q.receive().await,
            Self::Redis(q) => q.receive().await,
            Self::RabbitMq(q) => q.receive().await,
            Self::InMemory(q) => q.receive().await,
        }
    }

    async fn ack(&self, receipt: ReceiptHandle) -> bool {
        match self {
            Self::File(q) => q.ack(receipt).await,
            Self::Redis(q) => q.ack(receipt).await,
            Self::RabbitMq(q) => q.ack(receipt).await,
            Self::InMemory(q) => q.ack(receipt).await,
        }
    }

    async fn nack(&self, receipt: ReceiptHandle, requeue: bool) -> bool {
        match self {
            Self::File(q) => q.nack(receipt, requeue).await,
            Self::Redis(q) => q.nack(receipt, requeue).await,
            Self::RabbitMq(q) => q.nack(receipt, requeue).await,
            Self::InMemory(q) => q.nack(receipt, requeue).await,
        }
    }

    async fn count(&self) -> usize {
        match self {
            Self::File(q) => q.count().await,
            Self::Redis(q) => q.count().await,
            Self::RabbitMq(q) => q.count().await,
            Self::InMemory(q) => q.count().await,
        }
    }

    async fn is_connected(&self) -> bool {
        match self {
            Self::File(q) => q.is_connected().await,
            Self::Redis(q) => q.is_connected().await,
            Self::RabbitMq(q) => q.is_connected().await,
            Self::InMemory(q) => q.is_connected().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AckPolicy, RabbitmqConfig, RedisConfig};

    fn queue_config(backend: QueueBackend, directory: std::path::PathBuf) -> QueueConfig {
        QueueConfig {
            backend,
            directory,
            redis: RedisConfig {
                host: "127.0.0.1".into(),
                port: 6379,
                password: None,
                database: None,
                key: "bot_updates".into(),
            },
            rabbitmq: RabbitmqConfig {
                host: "127.0.0.1".into(),
                port: 5672,
                user: "guest".into(),
                password: "guest".into(),
                queue: "bot_updates".into(),
                ack_policy: AckPolicy::BeforeProcess,
            },
        }
    }

    #[tokio::test]
    async fn test_json_backend_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("AppData").join("updates");
        let provider = QueueProvider::from_config(&queue_config(QueueBackend::Json, queue_dir.clone()))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "file");
        assert!(queue_dir.is_dir());
        assert!(provider.is_connected().await);
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let provider = QueueProvider::from_config(&queue_config(QueueBackend::Memory, "unused".into()))
            .await
            .unwrap();
        assert_eq!(provider.provider_name(), "memory");
        assert_eq!(provider.count().await, 0);
    }
}
