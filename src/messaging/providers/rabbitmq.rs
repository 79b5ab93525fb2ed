//! # RabbitMQ Queue
//!
//! One durable queue on the default exchange, persistent messages, and
//! `basic_get` for single-item pops.
//!
//! ## Acknowledgment
//!
//! | Policy | `receive` | Crash mid-dispatch |
//! |---|---|---|
//! | `BeforeProcess` (default) | acks before returning | message lost |
//! | `AfterProcess` | returns a receipt, caller acks | message redelivered |

use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AckPolicy, RabbitmqConfig};
use crate::constants::BACKEND_RECONNECT_INTERVAL;
use crate::messaging::codec;
use crate::messaging::traits::{Delivery, QueueDriver, ReceiptHandle};
use crate::messaging::QueueError;
use crate::updates::Update;

const DRIVER: &str = "rabbitmq";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Session {
    connection: Connection,
    channel: Channel,
}

impl Session {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Session>,
    last_attempt: Option<Instant>,
}

pub struct RabbitMqQueue {
    config: RabbitmqConfig,
    queue: String,
    ack_policy: AckPolicy,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for RabbitMqQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabbitMqQueue")
            .field("host", &self.config.host)
            .field("queue", &self.queue)
            .field("ack_policy", &self.ack_policy)
            .finish()
    }
}

impl RabbitMqQueue {
    /// Connect and declare the durable queue. Failure is logged and leaves
    /// the queue disconnected until a later operation reconnects it.
    pub async fn connect(config: &RabbitmqConfig) -> Self {
        let session = match Self::open(config).await {
            Ok(session) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    queue = %config.queue,
                    ack_policy = ?config.ack_policy,
                    "Connected to RabbitMQ queue"
                );
                Some(session)
            }
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "RabbitMQ connection failed");
                None
            }
        };

        Self {
            config: config.clone(),
            queue: config.queue.clone(),
            ack_policy: config.ack_policy,
            state: Mutex::new(SessionState {
                session,
                last_attempt: Some(Instant::now()),
            }),
        }
    }

    async fn open(config: &RabbitmqConfig) -> Result<Session, QueueError> {
        let url = config
            .connection_url()
            .map_err(|e| QueueError::connection(DRIVER, e.to_string()))?;

        let connection = tokio::time::timeout(
            CONNECT_TIMEOUT,
            Connection::connect(
                &url,
                ConnectionProperties::default().with_connection_name("courier-queue".into()),
            ),
        )
        .await
        .map_err(|_| QueueError::connection(DRIVER, "connection timed out"))??;

        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(Session {
            connection,
            channel,
        })
    }

    pub fn ack_policy(&self) -> AckPolicy {
        self.ack_policy
    }

    /// An open channel. A session whose connection or channel was closed is
    /// discarded and reopened at once; a failed open is retried at most once
    /// per [`BACKEND_RECONNECT_INTERVAL`].
    async fn channel(&self) -> Result<Channel, QueueError> {
        let mut state = self.state.lock().await;
        match &state.session {
            Some(session) if session.is_open() => return Ok(session.channel.clone()),
            Some(_) => {
                warn!(driver = DRIVER, queue = %self.queue, "RabbitMQ session closed, reopening");
                state.session = None;
                state.last_attempt = None;
            }
            None => {}
        }
        if state
            .last_attempt
            .is_some_and(|at| at.elapsed() < BACKEND_RECONNECT_INTERVAL)
        {
            return Err(QueueError::disconnected(DRIVER));
        }

        let opened = Self::open(&self.config).await;
        state.last_attempt = Some(Instant::now());
        let session = opened?;
        info!(host = %self.config.host, port = self.config.port, "Reconnected to RabbitMQ queue");
        let channel = session.channel.clone();
        state.session = Some(session);
        Ok(channel)
    }

    pub async fn try_push(&self, update: &Update) -> Result<(), QueueError> {
        let bytes = codec::encode(update)?;
        self.channel().await?
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &bytes,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await?
            .await?;
        Ok(())
    }

    /// Fetch one message. Under `BeforeProcess` the message is acknowledged
    /// here; under `AfterProcess` the receipt is handed back.
    pub async fn try_receive(&self) -> Result<Option<Delivery>, QueueError> {
        let channel = self.channel().await?;
        let Some(message) = channel
            .basic_get(&self.queue, BasicGetOptions { no_ack: false })
            .await?
        else {
            return Ok(None);
        };

        let receipt = ReceiptHandle::new(message.delivery.delivery_tag);
        let decoded = codec::decode(&message.delivery.data);

        match (decoded, self.ack_policy) {
            (Ok(update), AckPolicy::BeforeProcess) => {
                self.try_ack(receipt).await?;
                Ok(Some(Delivery::settled(update)))
            }
            (Ok(update), AckPolicy::AfterProcess) => Ok(Some(Delivery::pending(update, receipt))),
            (Err(e), _) => {
                // Malformed messages are never redelivered.
                self.try_nack(receipt, false).await?;
                Err(e)
            }
        }
    }

    pub async fn try_ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        self.channel().await?
            .basic_ack(receipt.tag(), BasicAckOptions::default())
            .await?;
        Ok(())
    }

    pub async fn try_nack(&self, receipt: ReceiptHandle, requeue: bool) -> Result<(), QueueError> {
        self.channel().await?
            .basic_nack(
                receipt.tag(),
                BasicNackOptions {
                    requeue,
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Message count from a passive declare.
    pub async fn try_count(&self) -> Result<usize, QueueError> {
        let queue = self
            .channel()
            .await?
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(queue.message_count() as usize)
    }
}

#[async_trait]
impl QueueDriver for RabbitMqQueue {
    fn driver_name(&self) -> &'static str {
        DRIVER
    }

    async fn push(&self, update: &Update) -> bool {
        match self.try_push(update).await {
            Ok(()) => {
                debug!(queue = %self.queue, "Published update to RabbitMQ");
                true
            }
            Err(e) => {
                warn!(
                    driver = DRIVER,
                    connectivity = e.is_connectivity(),
                    error = %e,
                    "Failed to publish to RabbitMQ queue"
                );
                false
            }
        }
    }

    async fn receive(&self) -> Option<Delivery> {
        match self.try_receive().await {
            Ok(delivery) => delivery,
            Err(QueueError::MalformedItem { message }) => {
                warn!(driver = DRIVER, error = %message, "Dropped malformed queue item");
                None
            }
            Err(e) => {
                warn!(
                    driver = DRIVER,
                    connectivity = e.is_connectivity(),
                    error = %e,
                    "Failed to get from RabbitMQ queue"
                );
                None
            }
        }
    }

    async fn ack(&self, receipt: ReceiptHandle) -> bool {
        match self.try_ack(receipt).await {
            Ok(()) => true,
            Err(e) => {
                warn!(driver = DRIVER, delivery_tag = receipt.tag(), error = %e, "Failed to ack message");
                false
            }
        }
    }

    async fn nack(&self, receipt: ReceiptHandle, requeue: bool) -> bool {
        match self.try_nack(receipt, requeue).await {
            Ok(()) => true,
            Err(e) => {
                warn!(driver = DRIVER, delivery_tag = receipt.tag(), error = %e, "Failed to nack message");
                false
            }
        }
    }

    async fn count(&self) -> usize {
        self.try_count().await.unwrap_or_else(|e| {
            warn!(driver = DRIVER, error = %e, "Failed to count RabbitMQ queue");
            0
        })
    }

    async fn is_connected(&self) -> bool {
        self.channel().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_rabbitmq_config(ack_policy: AckPolicy) -> RabbitmqConfig {
        RabbitmqConfig {
            host: std::env::var("RABBITMQ_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: 5672,
            user: "guest".to_string(),
            password: "guest".to_string(),
            queue: format!("courier_test_{}", uuid::Uuid::new_v4().simple()),
            ack_policy,
        }
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_disconnected() {
        let config = RabbitmqConfig {
            port: 1,
            ..test_rabbitmq_config(AckPolicy::BeforeProcess)
        };
        let queue = RabbitMqQueue::connect(&config).await;

        assert!(!queue.is_connected().await);
        assert!(!queue.push(&Update::from_value(json!({"message": {}})).unwrap()).await);
        assert!(queue.pop().await.is_none());
        assert_eq!(queue.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connection_is_retried_after_interval() {
        let config = RabbitmqConfig {
            port: 1,
            ..test_rabbitmq_config(AckPolicy::BeforeProcess)
        };
        let queue = RabbitMqQueue::connect(&config).await;

        assert!(matches!(
            queue.try_count().await.unwrap_err(),
            QueueError::Disconnected { .. }
        ));

        tokio::time::advance(BACKEND_RECONNECT_INTERVAL + Duration::from_millis(1)).await;
        let err = queue.try_count().await.unwrap_err();
        // An attempt was made and failed, rather than being short-circuited.
        assert!(!matches!(err, QueueError::Disconnected { .. }), "no reconnect attempted");
    }

    #[tokio::test]
    #[ignore = "requires a running RabbitMQ broker"]
    async fn test_closed_channel_is_reopened() {
        let queue = RabbitMqQueue::connect(&test_rabbitmq_config(AckPolicy::BeforeProcess)).await;
        assert!(queue.is_connected().await);

        // A passive declare of a missing queue closes the channel with 404.
        let channel = queue.channel().await.unwrap();
        let missing = channel
            .queue_declare(
                "courier_missing_queue",
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;
        assert!(missing.is_err());
        assert!(!channel.status().connected());

        assert!(queue.is_connected().await);
        let a = Update::from_value(json!({"update_id": 1, "message": {"text": "a"}})).unwrap();
        assert!(queue.push(&a).await);
        assert_eq!(queue.pop().await, Some(a));
    }

    #[tokio::test]
    #[ignore = "requires a running RabbitMQ broker"]
    async fn test_ack_before_process_fifo() {
        let queue = RabbitMqQueue::connect(&test_rabbitmq_config(AckPolicy::BeforeProcess)).await;
        assert!(queue.is_connected().await);

        let a = Update::from_value(json!({"update_id": 1, "message": {"text": "a"}})).unwrap();
        let b = Update::from_value(json!({"update_id": 2, "message": {"text": "b"}})).unwrap();
        assert!(queue.push(&a).await);
        assert!(queue.push(&b).await);

        let first = queue.receive().await.unwrap();
        assert_eq!(first.update, a);
        assert!(first.receipt.is_none());
        assert_eq!(queue.pop().await, Some(b));
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running RabbitMQ broker"]
    async fn test_ack_after_process_requeues_on_nack() {
        let queue = RabbitMqQueue::connect(&test_rabbitmq_config(AckPolicy::AfterProcess)).await;
        let a = Update::from_value(json!({"update_id": 1, "message": {"text": "a"}})).unwrap();
        assert!(queue.push(&a).await);

        let delivery = queue.receive().await.unwrap();
        let receipt = delivery.receipt.unwrap();
        assert!(queue.nack(receipt, true).await);

        let again = queue.receive().await.unwrap();
        assert_eq!(again.update, a);
        assert!(queue.ack(again.receipt.unwrap()).await);
        assert!(queue.pop().await.is_none());
    }
}
