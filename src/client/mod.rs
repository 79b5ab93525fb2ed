//! # Bot API Client
//!
//! The outbound transport collaborator: fetching update batches and sending
//! messages. Handlers and the orchestrator see it only as `Arc<dyn BotApi>`.

pub mod errors;
pub mod http;
pub mod traits;

pub use errors::TransportError;
pub use http::HttpBotApi;
pub use traits::{BotApi, GetUpdates};
