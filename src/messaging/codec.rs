//! Queue item codec.
//!
//! Items are UTF-8 JSON objects. `serde_json` writes non-ASCII characters
//! and `/` verbatim, so a stored item reads back byte-for-byte as the
//! platform sent it.

use crate::updates::Update;

use super::QueueError;

pub fn encode(update: &Update) -> Result<Vec<u8>, QueueError> {
    serde_json::to_vec(update).map_err(|e| QueueError::serialization(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Update, QueueError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| QueueError::malformed_item(e.to_string()))?;
    Update::from_value(value).map_err(|e| QueueError::malformed_item(e.to_string()))
}
