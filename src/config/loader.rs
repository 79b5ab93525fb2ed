//! Configuration Loader
//!
//! Layers settings from an optional TOML file and the process environment
//! (after loading a `.env` file, if present). Environment variables win over
//! file values. Keys are the upper-case environment names lower-cased, so
//! `BOT_TOKEN` and `bot_token = "..."` set the same field.

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::error::ConfigResult;
use super::{AppConfig, RawSettings};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `.env`, an optional TOML file and the environment, then
    /// validate. Callers log the result with [`AppConfig::log_summary`] once
    /// their subscriber is installed.
    pub fn load(path: Option<&Path>) -> ConfigResult<AppConfig> {
        Self::load_dotenv();

        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(Environment::default().try_parsing(true));

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        AppConfig::from_settings(raw)
    }

    /// Load from TOML text only. The process environment is not consulted.
    pub fn from_toml_str(content: &str) -> ConfigResult<AppConfig> {
        let raw: RawSettings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        AppConfig::from_settings(raw)
    }

    /// Load from an explicit variable map layered over optional TOML text,
    /// as if the map were the process environment.
    pub fn from_env_map(
        base_toml: Option<&str>,
        vars: HashMap<String, String>,
    ) -> ConfigResult<AppConfig> {
        let mut builder = Config::builder();
        if let Some(content) = base_toml {
            builder = builder.add_source(File::from_str(content, FileFormat::Toml));
        }
        let raw: RawSettings = builder
            .add_source(Environment::default().try_parsing(true).source(Some(vars)))
            .build()?
            .try_deserialize()?;
        AppConfig::from_settings(raw)
    }

    fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Failed to read .env file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AckPolicy, BotMode, ConfigurationError, QueueBackend, UpdateMode};
    use std::time::Duration;

    const BASE: &str = r#"
        bot_token = "123456:secret_Token-1"
        bot_api_url = "https://api.example.org"
        bot_mode = "webhook"
    "#;

    #[test]
    fn test_from_toml_str() {
        let config = ConfigLoader::from_toml_str(
            r#"
            bot_token = "123456:secret_Token-1"
            bot_api_url = "https://api.example.org"
            bot_mode = "update"
            update_mode = "queue"
            queue_save_type = "rabbitmq"
            rabbitmq_ack_policy = "after_process"
            plugins_reload_interval = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.mode, BotMode::Update);
        assert_eq!(config.update_mode, UpdateMode::Queue);
        assert_eq!(config.queue.backend, QueueBackend::RabbitMq);
        assert_eq!(config.queue.rabbitmq.ack_policy, AckPolicy::AfterProcess);
        assert_eq!(config.handlers.reload_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_environment_overrides_file() {
        let vars = HashMap::from([
            ("QUEUE_SAVE_TYPE".to_string(), "redis".to_string()),
            ("REDIS_PORT".to_string(), "6380".to_string()),
            ("REDIS_PASSWORD".to_string(), "12345".to_string()),
        ]);
        let config = ConfigLoader::from_env_map(Some(BASE), vars).unwrap();

        assert_eq!(config.bot.mode, BotMode::Webhook);
        assert_eq!(config.queue.backend, QueueBackend::Redis);
        assert_eq!(config.queue.redis.port, 6380);
        assert_eq!(config.queue.redis.password.as_deref(), Some("12345"));
    }

    #[test]
    fn test_missing_bot_mode_is_reported() {
        let err = ConfigLoader::from_toml_str(
            r#"
            bot_token = "123456:abc"
            bot_api_url = "https://api.example.org"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingRequiredField { ref field } if field == "BOT_MODE"));
    }

    #[test]
    fn test_unparseable_source_is_load_error() {
        let err = ConfigLoader::from_toml_str("bot_token = [unterminated").unwrap_err();
        assert!(matches!(err, ConfigurationError::LoadError { .. }));
    }
}
