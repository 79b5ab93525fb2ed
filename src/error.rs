//! # Error Taxonomy
//!
//! Crate-level error type. Each layer keeps its own structured error
//! (`QueueError`, `ConfigurationError`, `HandlerError`, `DiscoveryError`,
//! `TransportError`) and converts into [`CourierError`] at the boundary
//! where the caller needs a single type.

use thiserror::Error;

use crate::client::TransportError;
use crate::config::ConfigurationError;
use crate::messaging::QueueError;
use crate::registry::DiscoveryError;

#[derive(Error, Debug)]
pub enum CourierError {
    /// Missing or invalid required setting. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Backend unreachable. Recoverable with backoff.
    #[error("Connectivity error: {driver}: {message}")]
    Connectivity { driver: String, message: String },

    /// A handler hook failed. Isolated to that single invocation.
    #[error("Handler execution error: {handler}::{hook}: {message}")]
    HandlerExecution {
        handler: String,
        hook: String,
        message: String,
    },

    /// A popped item was not a JSON object or was not classifiable.
    #[error("Malformed queue item: {message}")]
    MalformedItem { message: String },

    /// A candidate handler failed validation during discovery.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CourierError {
    pub fn connectivity(driver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            driver: driver.into(),
            message: message.into(),
        }
    }

    pub fn malformed_item(message: impl Into<String>) -> Self {
        Self::MalformedItem {
            message: message.into(),
        }
    }

    /// Whether the error is fatal at process start.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<QueueError> for CourierError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Disconnected { driver } => {
                CourierError::connectivity(driver, "backend is not connected")
            }
            QueueError::Connection { driver, message } => CourierError::connectivity(driver, message),
            QueueError::MalformedItem { message } => CourierError::malformed_item(message),
            QueueError::Io { source, .. } => CourierError::Io(source),
            other => CourierError::connectivity("queue", other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_conversion() {
        let err: CourierError = QueueError::disconnected("redis").into();
        assert!(matches!(err, CourierError::Connectivity { .. }));
        assert!(!err.is_fatal());

        let err: CourierError = QueueError::malformed_item("not an object").into();
        assert!(matches!(err, CourierError::MalformedItem { .. }));
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err: CourierError = ConfigurationError::missing_required_field("BOT_TOKEN").into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("BOT_TOKEN"));
    }
}
