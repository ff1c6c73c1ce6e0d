//! Forge type definitions: remote work items and the selectors that fetch them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a remote item, `owner/repo#123` for pull requests.
    ItemId
);

string_id!(
    /// Name of an independently-fetched view (`review-requested`, `inbox`, ...).
    ViewId
);

impl ItemId {
    /// Build the canonical id of a pull request.
    pub fn for_pull_request(repository: &str, number: u64) -> Self {
        Self(format!("{}#{}", repository, number))
    }

    /// Split a pull request id into `(repository, number)`.
    ///
    /// Returns `None` when the id is not of the form `owner/repo#N`.
    pub fn pull_request_parts(&self) -> Option<(&str, u64)> {
        let (repository, number) = self.0.rsplit_once('#')?;
        if !repository.contains('/') {
            return None;
        }
        let number = number.parse().ok()?;
        Some((repository, number))
    }
}

/// Pull request state from a forge platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    #[default]
    Open,
    Draft,
    Merged,
    Closed,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Draft => write!(f, "draft"),
            Self::Merged => write!(f, "merged"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A remotely-hosted pull/merge request as seen by the local view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestItem {
    pub id: ItemId,
    pub number: u64,
    pub title: String,
    /// `owner/name` of the hosting repository.
    pub repository: String,
    pub url: String,
    pub author: String,
    #[serde(default)]
    pub state: PrState,
    /// Total conversation activity: comments including review comments and
    /// nested replies. The change detector diffs this count between batches.
    pub activity_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Cursor information for paginated fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// An item requested by id that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: ItemId,
    pub message: String,
}

/// One page of items returned by a [`DataSource`](super::DataSource).
///
/// Fetches by explicit id report per-item failures in `failures` and keep
/// the items that did load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBatch {
    pub items: Vec<PullRequestItem>,
    pub page_info: PageInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

/// What a data source should fetch.
///
/// `item_ids` restricts the fetch to exactly those items (used for followed
/// items); otherwise `repository` and `search` describe a list query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ViewSelector {
    pub fn repository(repository: impl Into<String>) -> Self {
        Self {
            repository: Some(repository.into()),
            ..Default::default()
        }
    }

    pub fn items(item_ids: Vec<ItemId>) -> Self {
        Self {
            item_ids,
            ..Default::default()
        }
    }
}

/// Whether a view is fetched from the data source or manages its own data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Remote,
    /// Notification inbox, pinned items, and similar locally-owned views.
    /// Manual refresh never fetches these.
    Virtual,
}

/// A named view and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub id: ViewId,
    pub selector: ViewSelector,
    #[serde(default)]
    pub kind: ViewKind,
}

impl ViewDefinition {
    pub fn remote(id: impl Into<ViewId>, selector: ViewSelector) -> Self {
        Self {
            id: id.into(),
            selector,
            kind: ViewKind::Remote,
        }
    }

    pub fn virtual_view(id: impl Into<ViewId>) -> Self {
        Self {
            id: id.into(),
            selector: ViewSelector::default(),
            kind: ViewKind::Virtual,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.kind == ViewKind::Virtual
    }
}
