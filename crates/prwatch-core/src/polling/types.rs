//! Scheduler configuration, status, and error types.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use prwatch_config::PollingConfig;
use tokio::time::Instant;

use crate::errors::PrwatchError;
use crate::forge::ForgeError;

/// Boxed future produced by one invocation of a poll task.
pub type PollFuture = BoxFuture<'static, Result<(), TaskError>>;

/// Caller-supplied task run once per poll cycle.
pub type PollTask = Arc<dyn Fn() -> PollFuture + Send + Sync>;

/// Wrap an async closure into a [`PollTask`].
pub fn poll_task<F, Fut>(task: F) -> PollTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(move || Box::pin(task()) as PollFuture)
}

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
    /// Keep polling while the host is hidden.
    pub background_allowed: bool,
    /// Run the task as soon as `start()` is called instead of after one
    /// full interval.
    pub immediate: bool,
}

impl SchedulerConfig {
    pub fn from_polling(polling: &PollingConfig) -> Self {
        Self {
            enabled: polling.enabled(),
            interval: polling.interval(),
            timeout: polling.timeout(),
            background_allowed: polling.background_enabled(),
            immediate: true,
        }
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_polling(&PollingConfig::default())
    }
}

/// Point-in-time view of a scheduler, published after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub running: bool,
    pub last_run_at: Option<Instant>,
    pub next_run_at: Option<Instant>,
    pub interval: Duration,
    pub timeout: Duration,
    pub task_in_flight: bool,
}

impl SchedulerStatus {
    /// Countdown until the next scheduled tick; `None` when nothing is
    /// scheduled (stopped, or waiting for an in-flight task to settle).
    pub fn time_until_next_run(&self) -> Option<Duration> {
        self.next_run_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Failure reported by a poll task. Logged by the scheduler, never
/// propagated past it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ForgeError> for TaskError {
    fn from(error: ForgeError) -> Self {
        Self::new(error.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler is no longer running")]
    Stopped,
}

impl PrwatchError for SchedulerError {
    fn error_code(&self) -> &'static str {
        match self {
            SchedulerError::Stopped => "SCHEDULER_STOPPED",
        }
    }
}
