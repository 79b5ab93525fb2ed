//! # Structured Logging Module
//!
//! Console logging always, plus a JSON file layer when `LOG_ENABLED` is set.
//! Every queue, handler and run-loop event goes through `tracing`, so the
//! file log carries the same structured fields as the console.

use chrono::Utc;
use std::fs;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize structured logging. Safe to call more than once; only the
/// first call installs a subscriber.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let log_level = get_log_level();

        let console = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        let file = if config.enabled {
            match fs::create_dir_all(&config.directory) {
                Ok(()) => {
                    let appender = tracing_appender::rolling::never(&config.directory, &config.file);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    let _ = FILE_GUARD.set(guard);
                    Some(
                        fmt::layer()
                            .with_writer(writer)
                            .with_target(true)
                            .with_level(true)
                            .with_ansi(false)
                            .json()
                            .with_filter(EnvFilter::new(log_level.clone())),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "Failed to create log directory {}: {e}",
                        config.directory.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        // A subscriber may already be installed, e.g. by a test harness.
        if tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %get_environment(),
            file_logging = config.enabled,
            log_file = %config.directory.join(&config.file).display(),
            "Structured logging initialized"
        );
    });
}

/// `RUST_LOG` if set, otherwise a level derived from the environment name.
fn get_log_level() -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| level_for_environment(&get_environment()).to_string())
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("COURIER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn level_for_environment(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for queue operations
pub fn log_queue_operation(
    operation: &str,
    backend: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        backend = %backend,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "QUEUE_OPERATION"
    );
}

/// Log structured data for registry operations
pub fn log_registry_operation(
    operation: &str,
    handler: Option<&str>,
    priority: Option<i32>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        handler = handler,
        priority = priority,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "REGISTRY_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(level_for_environment("test"), "debug");
        assert_eq!(level_for_environment("development"), "debug");
        assert_eq!(level_for_environment("production"), "info");
        assert_eq!(level_for_environment("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            enabled: true,
            directory: dir.path().join("logs"),
            file: "log.txt".to_string(),
        };

        init_structured_logging(&config);
        init_structured_logging(&config);

        log_queue_operation("push", "memory", "ok", None);
        log_registry_operation("load", Some("start"), Some(6), "ok", None);
        log_error("test", "noop", "nothing failed", Some("idempotency"));
    }
}
