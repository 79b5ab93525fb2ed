//! # Handler Descriptor
//!
//! A handler is a name, a priority and a set of optional hooks. Every hook
//! is a [`Hook`]: either a boxed async function or `Absent`. There is no
//! runtime probing for methods; the dispatcher asks the descriptor for the
//! hook registered under a method name and skips it if absent.
//!
//! ```rust
//! use courier_core::registry::{HandlerDescriptor, HandlerError};
//! use courier_core::updates::UpdateKind;
//!
//! let handler = HandlerDescriptor::builder("echo")
//!     .priority(10)
//!     .on(UpdateKind::Message, |payload, client| async move {
//!         let chat_id = payload.chat_id().ok_or_else(|| HandlerError::new("no chat"))?;
//!         client.send_message(chat_id, payload.text().unwrap_or_default()).await?;
//!         Ok::<_, HandlerError>(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert!(handler.hook("onMessage").is_present());
//! assert!(!handler.hook("onPoll").is_present());
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

use super::DiscoveryError;
use crate::client::{BotApi, TransportError};
use crate::updates::{Payload, UpdateKind};

pub const BEFORE_HOOK: &str = "before";
pub const AFTER_HOOK: &str = "after";

pub type HookFuture = BoxFuture<'static, Result<(), HandlerError>>;

/// Type-erased hook: `(payload, client) -> future`.
pub type HookFn = Arc<dyn Fn(Arc<Payload>, Arc<dyn BotApi>) -> HookFuture + Send + Sync>;

/// An optional lifecycle hook.
#[derive(Clone, Default)]
pub enum Hook {
    Present(HookFn),
    #[default]
    Absent,
}

impl Hook {
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Payload>, Arc<dyn BotApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::Present(Arc::new(move |payload, client| f(payload, client).boxed()))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The future for this hook, or `None` when absent.
    pub fn invoke(&self, payload: Arc<Payload>, client: Arc<dyn BotApi>) -> Option<HookFuture> {
        match self {
            Self::Present(f) => Some(f(payload, client)),
            Self::Absent => None,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Present(_) => "Present",
            Self::Absent => "Absent",
        })
    }
}

/// Failure raised by a hook, with the source location that raised it.
#[derive(Error, Debug, Clone)]
#[error("{message} (at {location})")]
pub struct HandlerError {
    message: String,
    location: &'static Location<'static>,
}

impl HandlerError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Built from an escaped panic; the location is the isolation point.
    #[track_caller]
    pub fn from_panic(panic: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new(format!("panic: {message}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl From<TransportError> for HandlerError {
    #[track_caller]
    fn from(err: TransportError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    name: String,
    priority: i32,
    before: Hook,
    after: Hook,
    /// Keyed by hook name, e.g. `onMessage`
    hooks: HashMap<String, Hook>,
}

impl HandlerDescriptor {
    pub fn builder(name: impl Into<String>) -> HandlerBuilder {
        HandlerBuilder {
            name: name.into(),
            priority: None,
            before: Hook::Absent,
            after: Hook::Absent,
            hooks: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower runs earlier.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn before(&self) -> &Hook {
        &self.before
    }

    pub fn after(&self) -> &Hook {
        &self.after
    }

    /// Hook registered under `method` (`before`, `after` or `on<Kind>`).
    pub fn hook(&self, method: &str) -> Hook {
        match method {
            BEFORE_HOOK => self.before.clone(),
            AFTER_HOOK => self.after.clone(),
            _ => self.hooks.get(method).cloned().unwrap_or_default(),
        }
    }

    /// Names of the kind hooks this handler defines, sorted.
    pub fn hook_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

pub struct HandlerBuilder {
    name: String,
    priority: Option<i32>,
    before: Hook,
    after: Hook,
    hooks: HashMap<String, Hook>,
}

impl HandlerBuilder {
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn before<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Payload>, Arc<dyn BotApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.before = Hook::from_fn(f);
        self
    }

    pub fn after<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Payload>, Arc<dyn BotApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.after = Hook::from_fn(f);
        self
    }

    pub fn on<F, Fut>(self, kind: UpdateKind, f: F) -> Self
    where
        F: Fn(Arc<Payload>, Arc<dyn BotApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_hook(kind.hook_name(), Hook::from_fn(f))
    }

    /// Register an already-built hook under an explicit hook name.
    pub fn on_hook(mut self, method: impl Into<String>, hook: Hook) -> Self {
        self.hooks.insert(method.into(), hook);
        self
    }

    /// Fails when no priority was declared.
    pub fn build(self) -> Result<HandlerDescriptor, DiscoveryError> {
        let priority = self
            .priority
            .ok_or_else(|| DiscoveryError::missing_priority(&self.name))?;
        Ok(HandlerDescriptor {
            name: self.name,
            priority,
            before: self.before,
            after: self.after,
            hooks: self.hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_: Arc<Payload>, _: Arc<dyn BotApi>) -> Result<(), HandlerError> {
        Ok(())
    }

    #[test]
    fn test_builder_requires_priority() {
        let err = HandlerDescriptor::builder("nameless").build().unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingPriority { .. }));
    }

    #[test]
    fn test_hook_lookup() {
        let handler = HandlerDescriptor::builder("h")
            .priority(1)
            .before(noop)
            .on(UpdateKind::CallbackQuery, noop)
            .build()
            .unwrap();

        assert!(handler.hook("before").is_present());
        assert!(!handler.hook("after").is_present());
        assert!(handler.hook("onCallbackQuery").is_present());
        assert!(!handler.hook("onMessage").is_present());
        assert_eq!(handler.hook_names(), vec!["onCallbackQuery"]);
        assert_eq!(handler.with_priority(-3).priority(), -3);
    }

    #[test]
    fn test_handler_error_records_caller() {
        let err = HandlerError::new("boom");
        assert_eq!(err.location().file(), file!());
        assert!(err.to_string().starts_with("boom (at "));
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = HandlerError::from_panic(&"static str");
        assert_eq!(err.message(), "panic: static str");

        let err = HandlerError::from_panic(&String::from("owned"));
        assert_eq!(err.message(), "panic: owned");

        let err = HandlerError::from_panic(&42_u8);
        assert_eq!(err.message(), "panic: handler panicked");
    }
}
