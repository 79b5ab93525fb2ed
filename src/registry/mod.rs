//! # Handler Registry
//!
//! Handler descriptors, the compiled catalog of handler factories, manifest
//! discovery and the hot-reloading registry.
//!
//! ```text
//! plugins/*.toml ──discover──▶ HandlerManifest ──catalog──▶ HandlerDescriptor
//!                                                              │
//!                                  sort by priority (stable) ◀─┘
//!                                              │
//!                               RwLock<Arc<HandlerSet>> (swapped whole)
//! ```

pub mod catalog;
pub mod errors;
pub mod handler;
pub mod handler_registry;
pub mod manifest;

pub use catalog::{HandlerCatalog, HandlerFactory, HandlerSettings};
pub use errors::DiscoveryError;
pub use handler::{
    HandlerBuilder, HandlerDescriptor, HandlerError, Hook, HookFn, HookFuture, AFTER_HOOK,
    BEFORE_HOOK,
};
pub use handler_registry::{HandlerRegistry, HandlerSet};
pub use manifest::{discover_manifests, HandlerManifest};
