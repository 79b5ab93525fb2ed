//! Run mode selection.

use std::fmt;

use crate::config::{AppConfig, BotMode, UpdateMode};

/// Fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Webhook,
    Poll,
    QueueWorker,
}

impl RunMode {
    /// `UPDATE_MODE=queue` runs the worker; otherwise `BOT_MODE` picks
    /// between webhook and poll.
    pub fn from_config(config: &AppConfig) -> Self {
        match (config.update_mode, config.bot.mode) {
            (UpdateMode::Queue, _) => Self::QueueWorker,
            (UpdateMode::Normal, BotMode::Webhook) => Self::Webhook,
            (UpdateMode::Normal, BotMode::Update) => Self::Poll,
        }
    }

    /// The producer-side mode for `BOT_MODE`, used when feeding the queue.
    pub fn producer_for(mode: BotMode) -> Self {
        match mode {
            BotMode::Webhook => Self::Webhook,
            BotMode::Update => Self::Poll,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Poll => "poll",
            Self::QueueWorker => "queue_worker",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What Webhook and Poll do with each inbound update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the handlers in this process
    Dispatch,
    /// Push to the queue for a worker
    Enqueue,
}
