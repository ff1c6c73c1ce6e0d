//! Snapshot diffing between consecutive item batches.

use std::collections::{HashMap, HashSet};

use crate::forge::types::{ItemId, PullRequestItem};

/// Retained baseline: which ids were present and their activity counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    ids: HashSet<ItemId>,
    activity: HashMap<ItemId, u32>,
}

impl ActivitySnapshot {
    pub fn capture(items: &[PullRequestItem]) -> Self {
        let mut snapshot = Self::default();
        for item in items {
            snapshot.ids.insert(item.id.clone());
            snapshot.activity.insert(item.id.clone(), item.activity_count);
        }
        snapshot
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn activity_count(&self, id: &ItemId) -> Option<u32> {
        self.activity.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Copy the entries for `ids` from `previous` when this snapshot lacks them.
    fn carry_over(&mut self, previous: &ActivitySnapshot, ids: &[ItemId]) {
        for id in ids {
            if self.contains(id) {
                continue;
            }
            if let Some(count) = previous.activity_count(id) {
                self.ids.insert(id.clone());
                self.activity.insert(id.clone(), count);
            }
        }
    }
}

/// An existing item whose activity count grew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityChange {
    pub item: PullRequestItem,
    /// `current - previous`, always > 0.
    pub delta: u32,
}

/// Result of diffing one batch against the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub new_items: Vec<PullRequestItem>,
    pub new_activity: Vec<ActivityChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_items.is_empty() && self.new_activity.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new_items.len() + self.new_activity.len()
    }
}

/// Two-state diff engine: cold (no baseline) or warm.
///
/// The first batch after construction or [`reset`](Self::reset) only
/// records a baseline and reports nothing.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    baseline: Option<ActivitySnapshot>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_warm(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&ActivitySnapshot> {
        self.baseline.as_ref()
    }

    /// Diff `items` against the baseline, then replace the baseline with
    /// `items` unconditionally.
    pub fn process_update(&mut self, items: &[PullRequestItem]) -> ChangeSet {
        self.process_update_retaining(items, &[])
    }

    /// Like [`process_update`](Self::process_update), but ids in `keep` that
    /// are missing from `items` keep their previous baseline entry. Used when
    /// those ids failed to load rather than disappeared.
    pub fn process_update_retaining(
        &mut self,
        items: &[PullRequestItem],
        keep: &[ItemId],
    ) -> ChangeSet {
        let mut current = ActivitySnapshot::capture(items);
        if let Some(previous) = &self.baseline {
            current.carry_over(previous, keep);
        }

        let Some(previous) = self.baseline.replace(current) else {
            return ChangeSet::default();
        };

        let mut changes = ChangeSet::default();
        let mut visited: HashSet<&ItemId> = HashSet::new();

        for item in items {
            if !visited.insert(&item.id) {
                continue;
            }
            match previous.activity_count(&item.id) {
                None => changes.new_items.push(item.clone()),
                Some(before) if item.activity_count > before => {
                    changes.new_activity.push(ActivityChange {
                        item: item.clone(),
                        delta: item.activity_count - before,
                    });
                }
                Some(_) => {}
            }
        }

        changes
    }

    /// Back to cold; the next batch becomes a fresh baseline.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
