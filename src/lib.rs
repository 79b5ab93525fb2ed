#![allow(clippy::doc_markdown)] // Allow technical terms like RabbitMQ, getUpdates in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Courier Core
//!
//! Durable update queue and priority-ordered handler dispatch for chat bot
//! platforms.
//!
//! ## Overview
//!
//! Inbound updates arrive either one at a time through a webhook or in
//! batches through long polling. Each update is either dispatched inline or
//! pushed to a durable queue, from which any number of worker processes pop
//! and dispatch it. Dispatch runs every registered handler in ascending
//! priority order, calling its `before`, kind-specific and `after` hooks,
//! each isolated from the others.
//!
//! ## Architecture
//!
//! ```text
//!  webhook / getUpdates
//!          │
//!     Orchestrator ──enqueue──▶ QueueManager ──▶ QueueProvider (file | redis | rabbitmq | memory)
//!          │                                          │
//!          │ dispatch                            pop (worker)
//!          ▼                                          │
//!     Dispatcher ◀────────────────────────────────────┘
//!          │  snapshot (hot-reloaded)
//!     HandlerRegistry ──▶ before / on<Kind> / after ──▶ BotApi
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Typed configuration, loading and validation
//! - [`error`] - Crate-level error taxonomy
//! - [`logging`] - Structured logging initialisation
//! - [`updates`] - Update model, kind classification and payloads
//! - [`messaging`] - Queue drivers and the queue manager
//! - [`registry`] - Handler descriptors, manifests and the hot-reloading registry
//! - [`dispatch`] - Per-update handler dispatch and reports
//! - [`client`] - Bot API transport
//! - [`orchestration`] - Run modes and the poll offset
//! - [`handlers`] - Built-in handlers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_core::client::HttpBotApi;
//! use courier_core::config::ConfigLoader;
//! use courier_core::orchestration::{Orchestrator, Route};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! config.ensure_data_layout()?;
//!
//! let client = Arc::new(HttpBotApi::new(&config.bot, &config.polling)?);
//! let orchestrator = Orchestrator::from_config(&config, client).await?;
//!
//! let summary = orchestrator.run_poll(Route::Dispatch).await?;
//! println!("handled {} updates, next offset {}", summary.handled, summary.offset);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                 # Unit tests
//! cargo test                       # Unit and integration tests
//! cargo test -- --ignored          # Redis and RabbitMQ tests (brokers required)
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod orchestration;
pub mod registry;
pub mod updates;

pub use client::{BotApi, GetUpdates, HttpBotApi, TransportError};
pub use config::{AppConfig, ConfigLoader, ConfigurationError};
pub use dispatch::{DispatchReport, Dispatcher, HookOutcome};
pub use error::{CourierError, Result};
pub use messaging::{QueueDriver, QueueError, QueueManager, QueueProvider};
pub use orchestration::{Orchestrator, Route, RunMode};
pub use registry::{HandlerDescriptor, HandlerError, HandlerRegistry};
pub use updates::{Payload, Update, UpdateKind};
