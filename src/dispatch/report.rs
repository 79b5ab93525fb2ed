//! Per-dispatch outcome record.

use std::time::Duration;

use crate::error::CourierError;
use crate::registry::HandlerError;
use crate::updates::UpdateKind;

#[derive(Debug, Clone)]
pub enum HookOutcome {
    Completed,
    /// The handler does not define this hook
    Skipped,
    Failed(HandlerError),
}

#[derive(Debug, Clone)]
pub struct HookInvocation {
    pub handler: String,
    pub hook: String,
    pub outcome: HookOutcome,
    pub duration: Duration,
}

impl HookInvocation {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, HookOutcome::Failed(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, HookOutcome::Completed)
    }
}

/// Everything one dispatch did, in invocation order.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub update_id: Option<i64>,
    /// `None` when the update matched no known kind
    pub kind: Option<UpdateKind>,
    pub method: Option<String>,
    /// Handler set generation the dispatch ran against
    pub generation: u64,
    pub reloaded: bool,
    pub invocations: Vec<HookInvocation>,
}

impl DispatchReport {
    pub fn is_classified(&self) -> bool {
        self.kind.is_some()
    }

    pub fn completed(&self) -> impl Iterator<Item = &HookInvocation> {
        self.invocations.iter().filter(|i| i.is_completed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &HookInvocation> {
        self.invocations.iter().filter(|i| i.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// `(handler, hook)` pairs that actually ran, successful or not.
    pub fn executed(&self) -> Vec<(&str, &str)> {
        self.invocations
            .iter()
            .filter(|i| !matches!(i.outcome, HookOutcome::Skipped))
            .map(|i| (i.handler.as_str(), i.hook.as_str()))
            .collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.invocations.iter().map(|i| i.duration).sum()
    }

    /// Failures as crate errors, for callers that want one error type.
    pub fn errors(&self) -> Vec<CourierError> {
        self.invocations
            .iter()
            .filter_map(|i| match &i.outcome {
                HookOutcome::Failed(error) => Some(CourierError::HandlerExecution {
                    handler: i.handler.clone(),
                    hook: i.hook.clone(),
                    message: error.to_string(),
                }),
                _ => None,
            })
            .collect()
    }
}
