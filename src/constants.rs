//! # System Constants
//!
//! Fixed intervals and defaults shared by the queue, registry and run loops.

use std::time::Duration;

/// Backoff applied by `QueueManager::pop` when the backend is disconnected.
pub const DISCONNECTED_POP_BACKOFF: Duration = Duration::from_secs(2);

/// Worker loop sleep after losing backend connectivity.
pub const WORKER_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Worker loop sleep after an empty pop.
pub const WORKER_IDLE_DELAY: Duration = Duration::from_millis(100);

/// Minimum time between reconnection attempts of a network queue driver.
pub const BACKEND_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Extension of queue item files in the filesystem backend.
pub const QUEUE_FILE_EXTENSION: &str = "json";

/// Extension of handler manifests in the handler directory.
pub const HANDLER_MANIFEST_EXTENSION: &str = "toml";

pub mod defaults {
    pub const UPDATE_MODE: &str = "normal";
    pub const QUEUE_BACKEND: &str = "json";

    pub const REDIS_HOST: &str = "127.0.0.1";
    pub const REDIS_PORT: u16 = 6379;
    pub const REDIS_KEY: &str = "bot_updates";

    pub const RABBITMQ_HOST: &str = "127.0.0.1";
    pub const RABBITMQ_PORT: u16 = 5672;
    pub const RABBITMQ_USER: &str = "guest";
    pub const RABBITMQ_PASSWORD: &str = "guest";
    pub const RABBITMQ_QUEUE: &str = "bot_updates";
    pub const RABBITMQ_ACK_POLICY: &str = "before_process";

    pub const PLUGINS_DIR: &str = "plugins";
    pub const PLUGINS_RELOAD_INTERVAL_SECONDS: u64 = 60;

    pub const DATA_DIR: &str = "AppData";
    pub const QUEUE_SUBDIR: &str = "updates";
    pub const POLLING_STATE_FILE: &str = "lastupdate.txt";
    pub const POLLING_LIMIT: u32 = 50;
    pub const POLLING_TIMEOUT_SECONDS: u32 = 30;
    pub const ALLOWED_UPDATES: &str = "all";

    pub const LOG_DIR: &str = "./logs/";
    pub const LOG_FILE: &str = "log.txt";
}
