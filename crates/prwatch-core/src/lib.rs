//! prwatch-core: polling and notification engine for pull request views
//!
//! Keeps local views of remotely hosted pull requests in sync with a
//! rate-limited forge API and turns consecutive snapshots into desktop
//! notifications. Used by the `prwatch` CLI; embedders supply their own
//! collaborators through the traits in [`forge`], [`notify`],
//! [`persistence`] and [`host`].
//!
//! # Main Entry Points
//!
//! - [`polling`] - Single-flight interval scheduler
//! - [`views`] - View refresh coordinator, view registry, followed items
//! - [`changes`] - Snapshot diffing and notification delivery
//! - [`prefetch`] - Hover-driven TTL cache
//! - [`seen`] - Persisted seen-state map

pub mod changes;
pub mod errors;
pub mod forge;
pub mod host;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod polling;
pub mod prefetch;
pub mod seen;
pub mod views;

#[cfg(test)]
mod test_support;

pub use changes::{ChangeDetector, ChangeSet, FallbackNotification, NotificationManager};
pub use errors::{PrwatchError, PrwatchResult};
pub use forge::{
    DataSource, FollowedItemsSource, ForgeError, GhCliSource, ItemBatch, ItemFailure, ItemId,
    PageInfo, PrState, PullRequestItem, ViewDefinition, ViewId, ViewKind, ViewSelector,
};
pub use host::{HostSignals, HostSignalsHandle, HostState};
pub use notify::{Notification, NotificationKind, NotificationSink, NotifyError, PlatformSink};
pub use persistence::{FileStore, MemoryStore, PersistenceError, PersistenceStore};
pub use polling::{PollScheduler, SchedulerConfig, SchedulerHandle, SchedulerStatus, TaskError};
pub use prefetch::{PrefetchCache, PrefetchCategory, PrefetchFetcher};
pub use seen::SeenStateStore;
pub use views::{
    Collaborators, FollowedItemsTracker, FollowedPollResult, RefreshOutcome,
    ViewPollingCoordinator, ViewRefresh, ViewRegistry, ViewSnapshot,
};

pub use prwatch_config::{ConfigError, PrwatchConfig};

// Re-export logging initialization
pub use logging::init_logging;
