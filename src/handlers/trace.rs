//! `trace`: logs every update it sees, before any other hook of its own.
//!
//! Settings: `include_payload = true` adds the full payload to the log line.

use tracing::info;

use crate::registry::{DiscoveryError, HandlerDescriptor, HandlerError, HandlerSettings};

pub const NAME: &str = "trace";
pub const DEFAULT_PRIORITY: i32 = 0;

pub fn factory(settings: &HandlerSettings) -> Result<HandlerDescriptor, DiscoveryError> {
    let include_payload = match settings.get("include_payload") {
        None => false,
        Some(value) => value
            .as_bool()
            .ok_or_else(|| DiscoveryError::factory(NAME, "'include_payload' must be a boolean"))?,
    };

    HandlerDescriptor::builder(NAME)
        .priority(DEFAULT_PRIORITY)
        .before(move |payload, _client| async move {
            if include_payload {
                info!(kind = %payload.kind(), update_id = ?payload.update_id(), payload = %payload.data(), "Update received");
            } else {
                info!(kind = %payload.kind(), update_id = ?payload.update_id(), "Update received");
            }
            Ok::<_, HandlerError>(())
        })
        .build()
}
