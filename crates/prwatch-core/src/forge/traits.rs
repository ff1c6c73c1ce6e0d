//! Data source trait definitions.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::forge::errors::ForgeError;
use crate::forge::types::{ItemBatch, ViewSelector};
use crate::views::followed::FollowedPollResult;

/// Capability to fetch remote items.
///
/// Implementations must be safely callable repeatedly and concurrently.
/// Retry and backoff policy, if any, lives inside the implementation; the
/// polling core never retries.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The canonical name of this source (e.g., "github").
    fn name(&self) -> &'static str;

    /// Fetch one page of items matching `selector`.
    async fn fetch_items(&self, selector: &ViewSelector) -> Result<ItemBatch, ForgeError>;

    /// Login/id of the authenticated user.
    async fn current_user_id(&self) -> Result<String, ForgeError>;
}

/// Capability to poll the user's followed items for changes.
#[async_trait]
pub trait FollowedItemsSource: Send + Sync {
    /// Number of items currently followed.
    fn followed_count(&self) -> usize;

    /// Followed count, republished whenever it changes.
    fn subscribe_count(&self) -> watch::Receiver<usize>;

    /// Check every followed item once and report what changed.
    async fn poll_followed_items(&self) -> FollowedPollResult;

    /// Drop any retained change baseline.
    fn reset(&self) {}
}
