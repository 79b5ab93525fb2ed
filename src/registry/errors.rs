//! Discovery error types. Every variant means "skip this candidate and
//! keep loading"; none of them abort a registry load.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read handler source {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("Invalid handler manifest {}: {message}", path.display())]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Unknown handler '{handler}' named in {}", path.display())]
    UnknownHandler { path: PathBuf, handler: String },

    #[error("Handler '{handler}' failed to initialize: {message}")]
    Factory { handler: String, message: String },

    #[error("Handler '{handler}' does not declare a priority")]
    MissingPriority { handler: String },
}

impl DiscoveryError {
    pub fn unreadable(path: &Path, message: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invalid_manifest(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn unknown_handler(path: &Path, handler: impl Into<String>) -> Self {
        Self::UnknownHandler {
            path: path.to_path_buf(),
            handler: handler.into(),
        }
    }

    pub fn factory(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Factory {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn missing_priority(handler: impl Into<String>) -> Self {
        Self::MissingPriority {
            handler: handler.into(),
        }
    }
}
