//! Shared per-view state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::forge::types::{PageInfo, PullRequestItem, ViewId};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Last known state of one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub items: Vec<PullRequestItem>,
    pub page_info: PageInfo,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Registry of [`ViewSnapshot`]s keyed by view id.
///
/// Constructed once and shared by reference. Entries are created on first
/// access and live until [`reset`](Self::reset) or [`reset_all`](Self::reset_all).
/// Every mutation publishes the affected view id to subscribers.
#[derive(Debug)]
pub struct ViewRegistry {
    views: Mutex<HashMap<ViewId, ViewSnapshot>>,
    changes: broadcast::Sender<ViewId>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            views: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn views(&self) -> MutexGuard<'_, HashMap<ViewId, ViewSnapshot>> {
        self.views.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current snapshot of `view`, creating an empty one on first access.
    pub fn get(&self, view: &ViewId) -> ViewSnapshot {
        self.views().entry(view.clone()).or_default().clone()
    }

    pub fn contains(&self, view: &ViewId) -> bool {
        self.views().contains_key(view)
    }

    pub fn view_ids(&self) -> Vec<ViewId> {
        let mut ids: Vec<ViewId> = self.views().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Mutate one view in place and notify subscribers.
    pub fn update(&self, view: &ViewId, mutate: impl FnOnce(&mut ViewSnapshot)) {
        {
            let mut views = self.views();
            mutate(views.entry(view.clone()).or_default());
        }
        let _ = self.changes.send(view.clone());
    }

    /// Drop one view's state; it is recreated empty on next access.
    pub fn reset(&self, view: &ViewId) {
        let removed = self.views().remove(view).is_some();
        if removed {
            let _ = self.changes.send(view.clone());
        }
    }

    pub fn reset_all(&self) {
        let removed: Vec<ViewId> = self.views().drain().map(|(id, _)| id).collect();
        for view in removed {
            let _ = self.changes.send(view);
        }
    }

    /// Ids of views as they change.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewId> {
        self.changes.subscribe()
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}
