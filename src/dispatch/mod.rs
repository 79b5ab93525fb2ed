//! # Dispatch
//!
//! Classification, hook routing and per-hook failure isolation.

pub mod dispatcher;
pub mod report;

pub use dispatcher::Dispatcher;
pub use report::{DispatchReport, HookInvocation, HookOutcome};
