//! # Dispatcher
//!
//! Routes one update through the handler set:
//!
//! 1. give the registry a chance to reload,
//! 2. classify the update (unknown kinds are dropped at debug level),
//! 3. build the payload once and share it across hooks,
//! 4. for each handler in priority order run `before`, the kind hook and
//!    `after`, each isolated from the others.
//!
//! A hook that returns an error or panics is recorded as failed and the
//! dispatch moves on to the next hook. The dispatcher itself has no side
//! effects beyond logging and triggering reloads.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use super::report::{DispatchReport, HookInvocation, HookOutcome};
use crate::client::BotApi;
use crate::registry::{HandlerDescriptor, HandlerError, HandlerRegistry, AFTER_HOOK, BEFORE_HOOK};
use crate::updates::{route_method_name, Payload, Update, UpdateKind};

pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    client: Arc<dyn BotApi>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, client: Arc<dyn BotApi>) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// First recognized kind present in the update.
    pub fn classify(update: &Update) -> Option<UpdateKind> {
        update.kind()
    }

    pub async fn dispatch(&self, update: &Update) -> DispatchReport {
        let reloaded = self.registry.maybe_reload();
        let handlers = self.registry.snapshot();

        let mut report = DispatchReport {
            update_id: update.update_id(),
            generation: handlers.generation(),
            reloaded,
            ..Default::default()
        };

        let Some(kind) = Self::classify(update) else {
            debug!(update_id = ?report.update_id, "Update matches no known kind, dropped");
            return report;
        };
        let Some(payload) = update.payload(kind) else {
            return report;
        };

        let method = route_method_name(kind.as_str());
        let payload = Arc::new(payload);
        report.kind = Some(kind);

        for handler in handlers.iter() {
            for hook in [BEFORE_HOOK, method.as_str(), AFTER_HOOK] {
                let invocation = self.invoke(handler, hook, Arc::clone(&payload)).await;
                report.invocations.push(invocation);
            }
        }

        report.method = Some(method);
        report
    }

    async fn invoke(&self, handler: &HandlerDescriptor, hook: &str, payload: Arc<Payload>) -> HookInvocation {
        let started = Instant::now();
        let client = Arc::clone(&self.client);
        // The hook closure runs synchronously before its future is polled.
        let started_hook =
            std::panic::catch_unwind(AssertUnwindSafe(|| handler.hook(hook).invoke(payload, client)));

        let outcome = match started_hook {
            Err(panic) => HookOutcome::Failed(HandlerError::from_panic(&*panic)),
            Ok(None) => HookOutcome::Skipped,
            Ok(Some(future)) => match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(())) => HookOutcome::Completed,
                Ok(Err(e)) => HookOutcome::Failed(e),
                Err(panic) => HookOutcome::Failed(HandlerError::from_panic(&*panic)),
            },
        };
        let duration = started.elapsed();

        match &outcome {
            HookOutcome::Completed => debug!(
                handler = handler.name(),
                hook,
                duration_ms = duration.as_secs_f64() * 1000.0,
                "Hook completed"
            ),
            HookOutcome::Failed(e) => error!(
                handler = handler.name(),
                hook,
                error = e.message(),
                location = %e.location(),
                "Handler hook failed"
            ),
            HookOutcome::Skipped => {}
        }

        HookInvocation {
            handler: handler.name().to_string(),
            hook: hook.to_string(),
            outcome,
            duration,
        }
    }
}
