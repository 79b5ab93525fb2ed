//! HTTP transport against `<api_url>/bot<token>/<method>`.
//!
//! Every response is the `{ok, result, description, error_code}` envelope;
//! `ok: false` becomes [`TransportError::Api`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{BotApi, TransportError};
use crate::config::{BotConfig, PollingConfig};

/// Slack added to the long-poll timeout for the HTTP request timeout.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Clone)]
pub struct HttpBotApi {
    http_client: reqwest::Client,
    /// `<api_url>/bot<token>`
    base_url: String,
}

impl std::fmt::Debug for HttpBotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBotApi")
            .field("base_url", &"[MASKED]")
            .finish()
    }
}

impl HttpBotApi {
    pub fn new(bot: &BotConfig, polling: &PollingConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(polling.timeout)) + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TransportError::configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: format!("{}/bot{}", bot.api_url.trim_end_matches('/'), bot.token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        debug!(method, "Calling bot API");

        let response = self
            .http_client
            .post(self.method_url(method))
            .json(&params)
            .send()
            .await
            .map_err(|e| TransportError::http(method, e.without_url().to_string()))?;

        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| TransportError::decode(method, format!("status {status}: {}", e.without_url())))?;

        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope(method: &str, envelope: Envelope) -> Result<Value, TransportError> {
    if envelope.ok {
        Ok(envelope.result.unwrap_or(Value::Null))
    } else {
        Err(TransportError::api(
            method,
            envelope.error_code,
            envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
        ))
    }
}
