//! Seen-state map with debounced write-through and periodic pruning.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::forge::types::{ItemId, PullRequestItem, ViewId};
use crate::persistence::PersistenceStore;

/// Persistence key holding the serialized map.
pub const SEEN_STATE_KEY: &str = "seen-state";

/// Cap applied after age-based pruning.
pub const MAX_ENTRIES: usize = 1000;

/// Entries older than this are dropped by pruning.
pub const MAX_AGE_DAYS: i64 = 30;

/// Minimum wall-clock gap between pruning passes.
pub const PRUNE_INTERVAL_HOURS: i64 = 24;

/// Quiet period before pending changes are written.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    pub seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<ViewId>,
}

/// On-disk layout under [`SEEN_STATE_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SeenState {
    #[serde(default)]
    entries: BTreeMap<ItemId, SeenEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_pruned_at: Option<DateTime<Utc>>,
}

impl SeenState {
    fn mark_seen(&mut self, id: &ItemId, view: Option<&ViewId>, now: DateTime<Utc>) {
        self.entries.insert(
            id.clone(),
            SeenEntry {
                seen_at: now,
                view_id: view.cloned(),
            },
        );
    }

    fn prune_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_pruned_at {
            Some(last) => now - last >= TimeDelta::hours(PRUNE_INTERVAL_HOURS),
            None => true,
        }
    }

    /// Prune if the last pass is at least a day old. Returns entries removed,
    /// or `None` when no pass ran.
    fn prune_if_due(&mut self, now: DateTime<Utc>) -> Option<usize> {
        if !self.prune_due(now) {
            return None;
        }
        Some(self.prune(now))
    }

    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let cutoff = now - TimeDelta::days(MAX_AGE_DAYS);
        self.entries.retain(|_, entry| entry.seen_at >= cutoff);

        if self.entries.len() > MAX_ENTRIES {
            let mut by_age: Vec<(DateTime<Utc>, ItemId)> = self
                .entries
                .iter()
                .map(|(id, entry)| (entry.seen_at, id.clone()))
                .collect();
            by_age.sort();
            let excess = self.entries.len() - MAX_ENTRIES;
            for (_, id) in by_age.into_iter().take(excess) {
                self.entries.remove(&id);
            }
        }

        self.last_pruned_at = Some(now);
        before - self.entries.len()
    }
}

struct StoreInner {
    store: Arc<dyn PersistenceStore>,
    state: Mutex<SeenState>,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, SeenState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Best effort: failures are logged and dropped.
    async fn write(&self) {
        let serialized = serde_json::to_string(&*self.state());
        let json = match serialized {
            Ok(json) => json,
            Err(e) => {
                warn!(event = "core.seen.serialize_failed", error = %e);
                return;
            }
        };

        match self.store.set(SEEN_STATE_KEY, &json).await {
            Ok(()) => debug!(event = "core.seen.flush_completed", bytes = json.len()),
            Err(e) => warn!(event = "core.seen.flush_failed", error = %e),
        }
    }
}

/// Tracks when each item was last seen.
///
/// Loaded once from a [`PersistenceStore`]; mutations are coalesced and
/// written after [`FLUSH_DEBOUNCE`] of quiet. Must be used within a Tokio
/// runtime.
pub struct SeenStateStore {
    inner: Arc<StoreInner>,
    pending_flush: Mutex<Option<JoinHandle<()>>>,
}

impl SeenStateStore {
    /// Load persisted state. A missing, unreadable or corrupt document
    /// yields an empty store.
    pub async fn load(store: Arc<dyn PersistenceStore>) -> Self {
        let state = match store.get(SEEN_STATE_KEY).await {
            Ok(Some(json)) => match serde_json::from_str::<SeenState>(&json) {
                Ok(state) => state,
                Err(e) => {
                    warn!(event = "core.seen.load_failed", reason = "corrupt", error = %e);
                    SeenState::default()
                }
            },
            Ok(None) => SeenState::default(),
            Err(e) => {
                warn!(event = "core.seen.load_failed", error = %e);
                SeenState::default()
            }
        };

        info!(event = "core.seen.load_completed", entries = state.entries.len());

        let seen = Self {
            inner: Arc::new(StoreInner {
                store,
                state: Mutex::new(state),
            }),
            pending_flush: Mutex::new(None),
        };
        seen.prune_if_due();
        seen
    }

    fn prune_if_due(&self) {
        let pruned = self.inner.state().prune_if_due(Utc::now());
        if let Some(removed) = pruned {
            debug!(event = "core.seen.prune_completed", removed = removed);
            self.schedule_flush();
        }
    }

    /// Restart the quiet-period timer; the write itself is detached so a
    /// later mutation cannot interrupt it.
    fn schedule_flush(&self) {
        let inner = self.inner.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(FLUSH_DEBOUNCE).await;
            tokio::spawn(async move { inner.write().await });
        });

        let mut pending = self.pending_flush.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(timer) {
            previous.abort();
        }
    }

    pub fn mark_seen(&self, id: &ItemId, view: Option<&ViewId>) {
        self.inner.state().mark_seen(id, view, Utc::now());
        self.prune_if_due();
        self.schedule_flush();
    }

    /// Returns whether the item had been seen.
    pub fn mark_unseen(&self, id: &ItemId) -> bool {
        let removed = self.inner.state().entries.remove(id).is_some();
        if removed {
            self.schedule_flush();
        }
        removed
    }

    pub fn is_seen(&self, id: &ItemId) -> bool {
        self.inner.state().entries.contains_key(id)
    }

    pub fn seen_entry(&self, id: &ItemId) -> Option<SeenEntry> {
        self.inner.state().entries.get(id).cloned()
    }

    pub fn mark_all_seen(&self, items: &[PullRequestItem], view: Option<&ViewId>) {
        if items.is_empty() {
            return;
        }
        {
            let now = Utc::now();
            let mut state = self.inner.state();
            for item in items {
                state.mark_seen(&item.id, view, now);
            }
        }
        self.prune_if_due();
        self.schedule_flush();
    }

    pub fn unseen_count(&self, items: &[PullRequestItem]) -> usize {
        let state = self.inner.state();
        items
            .iter()
            .filter(|item| !state.entries.contains_key(&item.id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.state().entries.clear();
        self.schedule_flush();
    }

    /// Write pending changes now instead of waiting for the quiet period.
    pub async fn flush(&self) {
        let pending = self
            .pending_flush
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(pending) = pending {
            pending.abort();
        }
        self.inner.write().await;
    }
}
