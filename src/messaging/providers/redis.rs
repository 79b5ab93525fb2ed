//! # Redis List Queue
//!
//! `RPUSH`/`LPOP` on one list key, which gives strict FIFO across every
//! producer and consumer sharing the key. Uses `redis::aio::ConnectionManager`
//! for a multiplexed connection that reconnects on its own.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RedisConfig;
use crate::constants::BACKEND_RECONNECT_INTERVAL;
use crate::messaging::codec;
use crate::messaging::traits::{Delivery, QueueDriver};
use crate::messaging::QueueError;
use crate::updates::Update;

const DRIVER: &str = "redis";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ConnectionState {
    manager: Option<redis::aio::ConnectionManager>,
    last_attempt: Option<Instant>,
}

pub struct RedisQueue {
    config: RedisConfig,
    state: Mutex<ConnectionState>,
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("key", &self.config.key)
            .field("host", &self.config.host)
            .finish()
    }
}

impl RedisQueue {
    /// Connect to Redis. A failed connection is logged and leaves the queue
    /// disconnected; later operations retry at most once per
    /// [`BACKEND_RECONNECT_INTERVAL`].
    pub async fn connect(config: &RedisConfig) -> Self {
        let manager = match Self::open(config).await {
            Ok(manager) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    key = %config.key,
                    "Connected to Redis queue"
                );
                Some(manager)
            }
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "Redis connection failed");
                None
            }
        };

        Self {
            config: config.clone(),
            state: Mutex::new(ConnectionState {
                manager,
                last_attempt: Some(Instant::now()),
            }),
        }
    }

    async fn open(config: &RedisConfig) -> Result<redis::aio::ConnectionManager, QueueError> {
        let url = config
            .connection_url()
            .map_err(|e| QueueError::connection(DRIVER, e.to_string()))?;
        let client = redis::Client::open(url.as_str())?;
        tokio::time::timeout(CONNECT_TIMEOUT, redis::aio::ConnectionManager::new(client))
            .await
            .map_err(|_| QueueError::connection(DRIVER, "connection timed out"))?
            .map_err(QueueError::from)
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    /// The shared connection, reopening it if the last attempt is older
    /// than the reconnect interval. Once established, `ConnectionManager`
    /// handles reconnects itself.
    async fn connection(&self) -> Result<redis::aio::ConnectionManager, QueueError> {
        let mut state = self.state.lock().await;
        if let Some(manager) = &state.manager {
            return Ok(manager.clone());
        }
        if state
            .last_attempt
            .is_some_and(|at| at.elapsed() < BACKEND_RECONNECT_INTERVAL)
        {
            return Err(QueueError::disconnected(DRIVER));
        }

        let opened = Self::open(&self.config).await;
        state.last_attempt = Some(Instant::now());
        let manager = opened?;
        info!(host = %self.config.host, port = self.config.port, "Reconnected to Redis queue");
        state.manager = Some(manager.clone());
        Ok(manager)
    }

    pub async fn try_push(&self, update: &Update) -> Result<(), QueueError> {
        let payload = String::from_utf8(codec::encode(update)?)
            .map_err(|e| QueueError::serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        redis::cmd("RPUSH")
            .arg(&self.config.key)
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn try_pop(&self) -> Result<Option<Update>, QueueError> {
        let mut conn = self.connection().await?;
        let item: Option<String> = redis::cmd("LPOP")
            .arg(&self.config.key)
            .query_async(&mut conn)
            .await?;
        item.map(|raw| codec::decode(raw.as_bytes())).transpose()
    }

    pub async fn try_count(&self) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        let len: usize = redis::cmd("LLEN")
            .arg(&self.config.key)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    pub async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(QueueError::connection(DRIVER, format!("unexpected PING reply '{pong}'")))
        }
    }
}

#[async_trait]
impl QueueDriver for RedisQueue {
    fn driver_name(&self) -> &'static str {
        DRIVER
    }

    async fn push(&self, update: &Update) -> bool {
        match self.try_push(update).await {
            Ok(()) => {
                debug!(key = %self.config.key, "Pushed update to Redis list");
                true
            }
            Err(e) => {
                warn!(
                    driver = DRIVER,
                    connectivity = e.is_connectivity(),
                    error = %e,
                    "Failed to push to Redis queue"
                );
                false
            }
        }
    }

    async fn receive(&self) -> Option<Delivery> {
        match self.try_pop().await {
            Ok(update) => update.map(Delivery::settled),
            Err(e) => {
                warn!(
                    driver = DRIVER,
                    connectivity = e.is_connectivity(),
                    error = %e,
                    "Failed to pop from Redis queue"
                );
                None
            }
        }
    }

    async fn count(&self) -> usize {
        self.try_count().await.unwrap_or_else(|e| {
            warn!(driver = DRIVER, error = %e, "Failed to count Redis queue");
            0
        })
    }

    async fn is_connected(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(driver = DRIVER, error = %e, "Redis liveness probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_redis_config() -> RedisConfig {
        RedisConfig {
            host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: 6379,
            password: None,
            database: None,
            key: format!("courier_test:{}", uuid::Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_disconnected() {
        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..test_redis_config()
        };
        let queue = RedisQueue::connect(&config).await;

        assert!(!queue.is_connected().await);
        assert!(!queue.push(&Update::from_value(json!({"message": {}})).unwrap()).await);
        assert!(queue.pop().await.is_none());
        assert_eq!(queue.count().await, 0);
        assert!(matches!(
            queue.try_count().await.unwrap_err(),
            QueueError::Disconnected { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connection_is_retried_after_interval() {
        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..test_redis_config()
        };
        let queue = RedisQueue::connect(&config).await;

        // Inside the interval no attempt is made.
        assert!(matches!(
            queue.try_count().await.unwrap_err(),
            QueueError::Disconnected { .. }
        ));

        tokio::time::advance(BACKEND_RECONNECT_INTERVAL + Duration::from_millis(1)).await;
        let err = queue.try_count().await.unwrap_err();
        // An attempt was made and failed, rather than being short-circuited.
        assert!(!matches!(err, QueueError::Disconnected { .. }), "no reconnect attempted");

        // The failed attempt restarts the interval.
        assert!(matches!(
            queue.try_count().await.unwrap_err(),
            QueueError::Disconnected { .. }
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_redis_fifo() {
        let queue = RedisQueue::connect(&test_redis_config()).await;
        assert!(queue.is_connected().await);

        let a = Update::from_value(json!({"update_id": 1, "message": {"text": "a"}})).unwrap();
        let b = Update::from_value(json!({"update_id": 2, "message": {"text": "b"}})).unwrap();
        assert!(queue.push(&a).await);
        assert!(queue.push(&b).await);
        assert_eq!(queue.count().await, 2);

        assert_eq!(queue.pop().await, Some(a));
        assert_eq!(queue.pop().await, Some(b));
        assert!(queue.pop().await.is_none());
    }
}
