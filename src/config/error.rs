//! Configuration Error Types
//!
//! Every variant is fatal at startup: the process refuses to run with a
//! configuration it cannot trust.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Required setting absent from every source
    #[error("Missing required configuration field '{field}'")]
    MissingRequiredField { field: String },

    /// Setting present but empty
    #[error("Configuration field '{field}' cannot be empty")]
    EmptyValue { field: String },

    /// Setting present but not acceptable
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// The layered sources could not be read or merged
    #[error("Failed to load configuration: {error}")]
    LoadError { error: String },

    /// File I/O errors while preparing data directories
    #[error("Failed to prepare '{path}': {error}")]
    FileSystemError { path: String, error: String },
}

impl ConfigurationError {
    pub fn missing_required_field<F: Into<String>>(field: F) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    pub fn empty_value<F: Into<String>>(field: F) -> Self {
        Self::EmptyValue {
            field: field.into(),
        }
    }

    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn load_error<E: std::fmt::Display>(error: E) -> Self {
        Self::LoadError {
            error: error.to_string(),
        }
    }

    pub fn file_system_error<P: Into<String>, E: std::fmt::Display>(path: P, error: E) -> Self {
        Self::FileSystemError {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::load_error(err)
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
