pub mod backends;
pub mod errors;
pub mod traits;
pub mod types;

// Re-export public API
pub use backends::GhCliSource;
pub use errors::ForgeError;
pub use traits::{DataSource, FollowedItemsSource};
pub use types::{
    ItemBatch, ItemFailure, ItemId, PageInfo, PrState, PullRequestItem, ViewDefinition, ViewId,
    ViewKind, ViewSelector,
};
