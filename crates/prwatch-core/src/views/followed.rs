//! Background tracking of explicitly followed items.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::changes::ChangeDetector;
use crate::changes::messages;
use crate::forge::traits::{DataSource, FollowedItemsSource};
use crate::forge::types::{ItemId, ViewSelector};
use crate::notify::Notification;

/// Outcome of one followed-items poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowedPollResult {
    pub checked: usize,
    pub changes_detected: usize,
    pub notifications_created: Vec<Notification>,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
struct Baseline {
    detector: ChangeDetector,
    /// Sequence number of the poll whose batch the detector last took.
    applied_seq: u64,
}

/// [`FollowedItemsSource`] over any [`DataSource`].
///
/// Fetches exactly the followed ids and diffs them with its own detector.
/// Only activity is reported; newly followed items join the baseline
/// silently. Notifications come back ungated; the caller applies the
/// notification gates.
///
/// A batch from a poll that started before the last applied one is
/// discarded, so overlapping polls never move the baseline backwards.
pub struct FollowedItemsTracker {
    source: Arc<dyn DataSource>,
    followed: Mutex<BTreeSet<ItemId>>,
    count_tx: watch::Sender<usize>,
    baseline: Mutex<Baseline>,
    poll_seq: AtomicU64,
}

impl FollowedItemsTracker {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            followed: Mutex::new(BTreeSet::new()),
            count_tx: watch::Sender::new(0),
            baseline: Mutex::new(Baseline::default()),
            poll_seq: AtomicU64::new(0),
        }
    }

    fn followed_set(&self) -> MutexGuard<'_, BTreeSet<ItemId>> {
        self.followed.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn baseline(&self) -> MutexGuard<'_, Baseline> {
        self.baseline.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns false if the item was already followed.
    pub fn follow(&self, id: ItemId) -> bool {
        let count = {
            let mut followed = self.followed_set();
            if !followed.insert(id.clone()) {
                return false;
            }
            followed.len()
        };
        info!(event = "core.followed.follow_completed", item_id = %id, count = count);
        self.count_tx.send_replace(count);
        true
    }

    /// Returns false if the item was not followed.
    pub fn unfollow(&self, id: &ItemId) -> bool {
        let count = {
            let mut followed = self.followed_set();
            if !followed.remove(id) {
                return false;
            }
            followed.len()
        };
        info!(event = "core.followed.unfollow_completed", item_id = %id, count = count);
        self.count_tx.send_replace(count);
        true
    }

    pub fn followed(&self) -> Vec<ItemId> {
        self.followed_set().iter().cloned().collect()
    }
}

#[async_trait]
impl FollowedItemsSource for FollowedItemsTracker {
    fn followed_count(&self) -> usize {
        self.followed_set().len()
    }

    fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    async fn poll_followed_items(&self) -> FollowedPollResult {
        let ids = self.followed();
        if ids.is_empty() {
            return FollowedPollResult::default();
        }

        let seq = self.poll_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(event = "core.followed.poll_started", count = ids.len(), seq = seq);

        let batch = match self.source.fetch_items(&ViewSelector::items(ids)).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(event = "core.followed.poll_failed", error = %e);
                return FollowedPollResult {
                    errors: vec![e.to_string()],
                    ..Default::default()
                };
            }
        };

        let errors: Vec<String> = batch
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.id, f.message))
            .collect();
        let failed: Vec<ItemId> = batch.failures.iter().map(|f| f.id.clone()).collect();

        let mut changes = {
            let mut baseline = self.baseline();
            if seq <= baseline.applied_seq {
                debug!(
                    event = "core.followed.poll_discarded",
                    seq = seq,
                    applied_seq = baseline.applied_seq,
                );
                return FollowedPollResult {
                    checked: batch.items.len(),
                    errors,
                    ..Default::default()
                };
            }
            baseline.applied_seq = seq;
            baseline
                .detector
                .process_update_retaining(&batch.items, &failed)
        };
        changes.new_items.clear();

        let notifications = messages::build(&changes);

        debug!(
            event = "core.followed.poll_completed",
            checked = batch.items.len(),
            failed = failed.len(),
            changes = changes.len(),
        );

        FollowedPollResult {
            checked: batch.items.len(),
            changes_detected: changes.len(),
            notifications_created: notifications,
            errors,
        }
    }

    fn reset(&self) {
        let mut baseline = self.baseline();
        baseline.detector.reset();
        // Polls already in flight predate the reset.
        baseline.applied_seq = self.poll_seq.load(Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::forge::types::{ItemBatch, ItemFailure};
    use crate::test_support::{FakeSource, item};

    fn tracker(source: Arc<FakeSource>) -> FollowedItemsTracker {
        FollowedItemsTracker::new(source)
    }

    #[tokio::test]
    async fn test_follow_updates_count_watch() {
        let tracker = tracker(Arc::new(FakeSource::new()));
        let rx = tracker.subscribe_count();

        assert!(tracker.follow(ItemId::from("acme/w#1")));
        assert!(!tracker.follow(ItemId::from("acme/w#1")));
        assert!(tracker.follow(ItemId::from("acme/w#2")));
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(tracker.followed_count(), 2);

        assert!(tracker.unfollow(&ItemId::from("acme/w#1")));
        assert!(!tracker.unfollow(&ItemId::from("acme/w#9")));
        assert_eq!(*rx.borrow(), 1);
    }

    #[tokio::test]
    async fn test_poll_with_nothing_followed_skips_fetch() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());

        let result = tracker.poll_followed_items().await;
        assert_eq!(result, FollowedPollResult::default());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_poll_fetches_followed_ids_and_reports_activity() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        tracker.follow(ItemId::from("acme/w#2"));

        source.push_ok(vec![item("acme/w", 1, 1), item("acme/w", 2, 0)]);
        let first = tracker.poll_followed_items().await;
        assert_eq!(first.checked, 2);
        assert_eq!(first.changes_detected, 0);

        source.push_ok(vec![item("acme/w", 1, 4), item("acme/w", 2, 0)]);
        let second = tracker.poll_followed_items().await;
        assert_eq!(second.changes_detected, 1);
        assert_eq!(second.notifications_created.len(), 1);
        assert_eq!(
            second.notifications_created[0].body,
            "3 new comments on #1 PR 1"
        );

        let calls = source.calls();
        assert_eq!(
            calls[0].item_ids,
            vec![ItemId::from("acme/w#1"), ItemId::from("acme/w#2")]
        );
    }

    #[tokio::test]
    async fn test_newly_followed_item_is_not_new() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        source.push_ok(vec![item("acme/w", 1, 0)]);
        tracker.poll_followed_items().await;

        tracker.follow(ItemId::from("acme/w#2"));
        source.push_ok(vec![item("acme/w", 1, 0), item("acme/w", 2, 5)]);
        let result = tracker.poll_followed_items().await;
        assert_eq!(result.changes_detected, 0);
        assert!(result.notifications_created.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_is_reported_not_raised() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        source.push_err("rate limited");

        let result = tracker.poll_followed_items().await;
        assert_eq!(result.checked, 0);
        assert_eq!(result.errors, vec!["Forge CLI error: rate limited".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_overlapping_poll_is_discarded() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        source.push_ok(vec![item("acme/w", 1, 0)]);
        tracker.poll_followed_items().await;

        source.push_delayed(Duration::from_millis(200), Ok(vec![item("acme/w", 1, 1)]));
        source.push_ok(vec![item("acme/w", 1, 3)]);
        let (slow, fast) = tokio::join!(tracker.poll_followed_items(), tracker.poll_followed_items());

        assert_eq!(fast.notifications_created.len(), 1);
        assert_eq!(fast.notifications_created[0].body, "3 new comments on #1 PR 1");
        assert_eq!(slow.changes_detected, 0);
        assert!(slow.notifications_created.is_empty());

        source.push_ok(vec![item("acme/w", 1, 3)]);
        let next = tracker.poll_followed_items().await;
        assert!(next.notifications_created.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_in_flight_during_reset_is_discarded() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        source.push_ok(vec![item("acme/w", 1, 0)]);
        tracker.poll_followed_items().await;

        source.push_delayed(Duration::from_millis(100), Ok(vec![item("acme/w", 1, 2)]));
        let (result, ()) = tokio::join!(tracker.poll_followed_items(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tracker.reset();
        });
        assert!(result.notifications_created.is_empty());

        // The next batch is a fresh baseline.
        source.push_ok(vec![item("acme/w", 1, 7)]);
        let next = tracker.poll_followed_items().await;
        assert!(next.notifications_created.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_loaded_items() {
        let source = Arc::new(FakeSource::new());
        let tracker = tracker(source.clone());
        tracker.follow(ItemId::from("acme/w#1"));
        tracker.follow(ItemId::from("acme/w#2"));
        source.push_ok(vec![item("acme/w", 1, 0), item("acme/w", 2, 4)]);
        tracker.poll_followed_items().await;

        source.push_batch(ItemBatch {
            items: vec![item("acme/w", 1, 2)],
            failures: vec![ItemFailure {
                id: ItemId::from("acme/w#2"),
                message: "not found".to_string(),
            }],
            ..Default::default()
        });
        let partial = tracker.poll_followed_items().await;
        assert_eq!(partial.checked, 1);
        assert_eq!(partial.errors, vec!["acme/w#2: not found".to_string()]);
        assert_eq!(partial.notifications_created.len(), 1);
        assert_eq!(
            partial.notifications_created[0].body,
            "2 new comments on #1 PR 1"
        );

        // The failed item kept its baseline, so its growth is still reported.
        source.push_ok(vec![item("acme/w", 1, 2), item("acme/w", 2, 5)]);
        let recovered = tracker.poll_followed_items().await;
        assert!(recovered.errors.is_empty());
        assert_eq!(recovered.notifications_created.len(), 1);
        assert_eq!(
            recovered.notifications_created[0].body,
            "1 new comment on #2 PR 2"
        );
    }
}
