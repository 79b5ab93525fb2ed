//! # Queue Error Types
//!
//! Structured errors for the queue drivers. The public driver contract never
//! surfaces these (it degrades to `false`/`None`), but each provider's
//! fallible `try_*` methods return them so callers and tests can see why an
//! operation was a no-op.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue backend '{driver}' is not connected")]
    Disconnected { driver: String },

    #[error("Connection error: {driver}: {message}")]
    Connection { driver: String, message: String },

    #[error("Queue operation failed: {driver}: {operation}: {message}")]
    Operation {
        driver: String,
        operation: String,
        message: String,
    },

    #[error("Malformed queue item: {message}")]
    MalformedItem { message: String },

    #[error("Item serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QueueError {
    pub fn disconnected(driver: impl Into<String>) -> Self {
        Self::Disconnected {
            driver: driver.into(),
        }
    }

    pub fn connection(driver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            driver: driver.into(),
            message: message.into(),
        }
    }

    pub fn operation(
        driver: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            driver: driver.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn malformed_item(message: impl Into<String>) -> Self {
        Self::MalformedItem {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the backend itself is unavailable, as opposed to a bad item.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Connection { .. })
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            QueueError::connection("redis", err.to_string())
        } else {
            QueueError::operation("redis", "command", err.to_string())
        }
    }
}

impl From<lapin::Error> for QueueError {
    fn from(err: lapin::Error) -> Self {
        QueueError::connection("rabbitmq", err.to_string())
    }
}

impl From<tokio::task::JoinError> for QueueError {
    fn from(err: tokio::task::JoinError) -> Self {
        QueueError::operation("file", "blocking task", err.to_string())
    }
}
