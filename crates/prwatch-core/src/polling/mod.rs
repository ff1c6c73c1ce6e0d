//! Interval polling with single-flight execution.

pub mod scheduler;
pub mod types;

pub use scheduler::{PollScheduler, SchedulerHandle};
pub use types::{
    PollFuture, PollTask, SchedulerConfig, SchedulerError, SchedulerStatus, TaskError, poll_task,
};
