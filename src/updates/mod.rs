//! # Updates
//!
//! Inbound update model: the recognized kinds, classification, hook naming
//! and the payload handed to handlers.

pub mod kind;
pub mod update;

pub use kind::{route_method_name, UpdateKind};
pub use update::{Payload, Update};
