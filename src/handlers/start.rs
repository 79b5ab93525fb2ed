//! `start`: echoes the text of every incoming message back to its sender.

use std::sync::Arc;

use crate::client::BotApi;
use crate::registry::{DiscoveryError, HandlerDescriptor, HandlerError, HandlerSettings};
use crate::updates::{Payload, UpdateKind};

pub const NAME: &str = "start";
pub const DEFAULT_PRIORITY: i32 = 6;

pub fn factory(_settings: &HandlerSettings) -> Result<HandlerDescriptor, DiscoveryError> {
    HandlerDescriptor::builder(NAME)
        .priority(DEFAULT_PRIORITY)
        .on(UpdateKind::Message, on_message)
        .build()
}

async fn on_message(payload: Arc<Payload>, client: Arc<dyn BotApi>) -> Result<(), HandlerError> {
    let sender = payload
        .i64_at("/from/id")
        .ok_or_else(|| HandlerError::new("message has no sender id"))?;
    let Some(text) = payload.text() else {
        // Stickers, photos and the like carry no text to echo.
        return Ok(());
    };
    client.send_message(sender, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl BotApi for Recorder {
        async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
            self.calls.lock().push((method.to_string(), params));
            Ok(json!({"message_id": 1}))
        }
    }

    #[tokio::test]
    async fn test_echoes_text_to_sender() {
        let recorder = Arc::new(Recorder::default());
        let payload = Arc::new(Payload::new(
            UpdateKind::Message,
            json!({"text": "/start", "from": {"id": 77}, "chat": {"id": 77}}),
        ));

        let handler = factory(&HandlerSettings::new()).unwrap();
        assert_eq!(handler.priority(), DEFAULT_PRIORITY);

        handler
            .hook("onMessage")
            .invoke(payload, recorder.clone())
            .unwrap()
            .await
            .unwrap();

        let calls = recorder.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1, json!({"chat_id": 77, "text": "/start"}));
    }

    #[tokio::test]
    async fn test_missing_sender_fails() {
        let payload = Arc::new(Payload::new(UpdateKind::Message, json!({"text": "hi"})));
        let err = on_message(payload, Arc::new(Recorder::default())).await.unwrap_err();
        assert_eq!(err.message(), "message has no sender id");
    }
}
