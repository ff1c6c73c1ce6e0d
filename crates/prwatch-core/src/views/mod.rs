//! View state, followed-item tracking and the refresh coordinator.

pub mod coordinator;
pub mod followed;
pub mod registry;

pub use coordinator::{
    Collaborators, RefreshOutcome, VIEW_SWITCH_DEBOUNCE, ViewPollingCoordinator, ViewRefresh,
};
pub use followed::{FollowedItemsTracker, FollowedPollResult};
pub use registry::{ViewRegistry, ViewSnapshot};
