//! Transport error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// Request never got a response
    #[error("HTTP error calling {method}: {message}")]
    Http { method: String, message: String },

    /// The API answered `ok: false`
    #[error("API error calling {method}: {description}")]
    Api {
        method: String,
        error_code: Option<i64>,
        description: String,
    },

    /// The response body was not the expected shape
    #[error("Invalid response from {method}: {message}")]
    Decode { method: String, message: String },

    #[error("Transport configuration error: {message}")]
    Configuration { message: String },
}

impl TransportError {
    pub fn http(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn api(
        method: impl Into<String>,
        error_code: Option<i64>,
        description: impl Into<String>,
    ) -> Self {
        Self::Api {
            method: method.into(),
            error_code,
            description: description.into(),
        }
    }

    pub fn decode(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
