//! Transport trait.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::TransportError;
use crate::updates::Update;

/// Parameters for one `getUpdates` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetUpdates {
    pub offset: i64,
    pub limit: u32,
    /// Long-poll timeout in seconds
    pub timeout: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

/// Bot API transport. Only [`call`](BotApi::call) is required; the typed
/// methods are built on it and may be overridden.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Invoke an API method and return the unwrapped `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Fetch a batch of updates starting at `request.offset`.
    async fn get_updates(&self, request: &GetUpdates) -> Result<Vec<Update>, TransportError> {
        let params =
            serde_json::to_value(request).map_err(|e| TransportError::decode("getUpdates", e.to_string()))?;
        let result = self.call("getUpdates", params).await?;
        let items: Vec<Value> = serde_json::from_value(result)
            .map_err(|e| TransportError::decode("getUpdates", e.to_string()))?;
        items
            .into_iter()
            .map(|item| {
                Update::from_value(item).map_err(|e| TransportError::decode("getUpdates", e.to_string()))
            })
            .collect()
    }

    /// Send a plain text message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Value, TransportError> {
        self.call("sendMessage", json!({"chat_id": chat_id, "text": text}))
            .await
    }
}
