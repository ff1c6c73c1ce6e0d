//! Hover-driven speculative fetching into a bounded TTL cache.

pub mod cache;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::forge::ForgeError;
use crate::forge::types::ItemId;

pub use cache::{HOVER_DEBOUNCE, MAX_CACHE_SIZE, PrefetchCache, TTL};

/// Kinds of per-item data fetched ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchCategory {
    Details,
    Comments,
    Checks,
}

impl PrefetchCategory {
    pub const ALL: [PrefetchCategory; 3] = [Self::Details, Self::Comments, Self::Checks];
}

impl std::fmt::Display for PrefetchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Details => write!(f, "details"),
            Self::Comments => write!(f, "comments"),
            Self::Checks => write!(f, "checks"),
        }
    }
}

/// Fetches one category of data for one item.
#[async_trait]
pub trait PrefetchFetcher: Send + Sync {
    async fn fetch(
        &self,
        id: &ItemId,
        category: PrefetchCategory,
    ) -> Result<serde_json::Value, ForgeError>;
}
