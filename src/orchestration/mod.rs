//! # Orchestration
//!
//! Ties the queue, the dispatcher and the transport together for one of the
//! three run modes:
//!
//! - **Webhook**: a single inbound update per process invocation
//! - **Poll**: one `getUpdates` batch per invocation, with a persisted offset
//! - **QueueWorker**: pop and dispatch until the process is stopped
//!
//! Webhook and Poll either dispatch each update inline or push it to the
//! queue for a worker, depending on the [`Route`].

pub mod offset_store;
pub mod orchestrator;
pub mod run_mode;

pub use offset_store::OffsetStore;
pub use orchestrator::{read_inbound_update, Disposition, Orchestrator, PollSummary, WorkerStep};
pub use run_mode::{Route, RunMode};
