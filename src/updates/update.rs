//! # Update and Payload
//!
//! [`Update`] is the opaque mapping received from the platform: one kind
//! key plus bookkeeping such as `update_id`. [`Payload`] is the
//! handler-facing view of the kind-specific part.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::UpdateKind;
use crate::error::{CourierError, Result};

/// One inbound update, kept as the raw JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Update(Map<String, Value>);

impl Update {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts only JSON objects. Anything else is a malformed item.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CourierError::malformed_item(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Platform-assigned identifier, present on polled updates.
    pub fn update_id(&self) -> Option<i64> {
        self.0.get("update_id").and_then(Value::as_i64)
    }

    /// First recognized kind present as a key, in classifier order.
    pub fn kind(&self) -> Option<UpdateKind> {
        UpdateKind::ALL
            .iter()
            .copied()
            .find(|kind| self.0.contains_key(kind.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Builds the handler-facing payload for `kind`. Returns `None` if the
    /// update does not carry that kind.
    pub fn payload(&self, kind: UpdateKind) -> Option<Payload> {
        self.0.get(kind.as_str()).map(|data| Payload {
            kind,
            update_id: self.update_id(),
            data: data.clone(),
        })
    }
}

impl From<Map<String, Value>> for Update {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Kind-specific part of an update, as handed to every hook.
///
/// Conversion is structural only: `data` is the same JSON the platform sent
/// under the kind key.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    kind: UpdateKind,
    update_id: Option<i64>,
    data: Value,
}

impl Payload {
    pub fn new(kind: UpdateKind, data: Value) -> Self {
        Self {
            kind,
            update_id: None,
            data,
        }
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    pub fn update_id(&self) -> Option<i64> {
        self.update_id
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Looks up a nested value by JSON pointer, e.g. `"/from/id"`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.data.pointer(pointer)
    }

    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.pointer(pointer).and_then(Value::as_str)
    }

    pub fn i64_at(&self, pointer: &str) -> Option<i64> {
        self.pointer(pointer).and_then(Value::as_i64)
    }

    /// Message text, for the message-like kinds.
    pub fn text(&self) -> Option<&str> {
        self.str_at("/text")
    }

    /// Chat the update belongs to, falling back to the sender.
    pub fn chat_id(&self) -> Option<i64> {
        self.i64_at("/chat/id")
            .or_else(|| self.i64_at("/message/chat/id"))
            .or_else(|| self.i64_at("/from/id"))
    }

    /// Deserializes the payload into a typed structure.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
