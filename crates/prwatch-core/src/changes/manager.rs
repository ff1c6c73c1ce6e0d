//! Change detection wired to notification delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::changes::detector::{ChangeDetector, ChangeSet};
use crate::changes::messages::{self, NotificationGates};
use crate::forge::types::{PullRequestItem, ViewId};
use crate::notify::{Notification, NotificationSink};

const FALLBACK_CHANNEL_CAPACITY: usize = 64;

/// A notification the platform channel could not show.
///
/// Subscribers render an in-app equivalent instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotification {
    pub notification: Notification,
    pub reason: String,
}

/// Owns one [`ChangeDetector`] per view, applies the notification gates and
/// delivers results through a [`NotificationSink`].
///
/// Delivery never fails from the caller's point of view: an unavailable or
/// failing sink raises a [`FallbackNotification`] instead.
pub struct NotificationManager {
    detectors: Mutex<HashMap<ViewId, ChangeDetector>>,
    gates: Mutex<NotificationGates>,
    sink: Arc<dyn NotificationSink>,
    fallback_tx: broadcast::Sender<FallbackNotification>,
}

impl NotificationManager {
    pub fn new(gates: NotificationGates, sink: Arc<dyn NotificationSink>) -> Self {
        let (fallback_tx, _) = broadcast::channel(FALLBACK_CHANNEL_CAPACITY);
        Self {
            detectors: Mutex::new(HashMap::new()),
            gates: Mutex::new(gates),
            sink,
            fallback_tx,
        }
    }

    fn detectors(&self) -> MutexGuard<'_, HashMap<ViewId, ChangeDetector>> {
        self.detectors.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn gates(&self) -> NotificationGates {
        *self.gates.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_gates(&self, gates: NotificationGates) {
        *self.gates.lock().unwrap_or_else(|e| e.into_inner()) = gates;
    }

    pub fn is_warm(&self, view: &ViewId) -> bool {
        self.detectors().get(view).is_some_and(|d| d.is_warm())
    }

    pub fn subscribe_fallback(&self) -> broadcast::Receiver<FallbackNotification> {
        self.fallback_tx.subscribe()
    }

    /// Diff `items` against the view's retained snapshot. Synchronous; the
    /// first batch for a view only captures its baseline.
    pub fn detect(&self, view: &ViewId, items: &[PullRequestItem]) -> ChangeSet {
        let mut detectors = self.detectors();
        let detector = detectors.entry(view.clone()).or_default();
        if !detector.is_warm() {
            debug!(
                event = "core.changes.baseline_captured",
                view_id = %view,
                items = items.len(),
            );
        }
        detector.process_update(items)
    }

    /// [`detect`](Self::detect) followed by delivery. Returns the
    /// notifications that were attempted.
    pub async fn process_update(
        &self,
        view: &ViewId,
        items: &[PullRequestItem],
    ) -> Vec<Notification> {
        let changes = self.detect(view, items);
        self.notify_changes(&changes).await
    }

    /// Deliver the notifications for an already-computed change set.
    pub async fn notify_changes(&self, changes: &ChangeSet) -> Vec<Notification> {
        if changes.is_empty() {
            return Vec::new();
        }

        info!(
            event = "core.changes.detected",
            new_items = changes.new_items.len(),
            new_activity = changes.new_activity.len(),
        );

        let notifications = messages::compose(changes, self.gates());
        for notification in &notifications {
            self.deliver(notification).await;
        }
        notifications
    }

    /// The subset of `notifications` the current gates let through.
    pub fn admitted(&self, mut notifications: Vec<Notification>) -> Vec<Notification> {
        let gates = self.gates();
        notifications.retain(|n| gates.allows(n.kind));
        notifications
    }

    /// Send one notification, falling back to an in-app event on failure.
    /// Kinds the current gates block are dropped.
    pub async fn deliver(&self, notification: &Notification) {
        if !self.gates().allows(notification.kind) {
            debug!(
                event = "core.notify.send_skipped",
                reason = "gated",
                kind = ?notification.kind,
            );
            return;
        }

        if !self.sink.is_available() {
            self.raise_fallback(notification, "notification channel unavailable".to_string());
            return;
        }

        match self.sink.send(notification).await {
            Ok(()) => {
                debug!(
                    event = "core.notify.send_completed",
                    sink = self.sink.name(),
                    title = %notification.title,
                );
            }
            Err(e) => {
                warn!(
                    event = "core.notify.send_failed",
                    sink = self.sink.name(),
                    error = %e,
                );
                self.raise_fallback(notification, e.to_string());
            }
        }
    }

    fn raise_fallback(&self, notification: &Notification, reason: String) {
        info!(
            event = "core.notify.fallback_raised",
            title = %notification.title,
            reason = %reason,
        );
        let fallback = FallbackNotification {
            notification: notification.clone(),
            reason,
        };
        if self.fallback_tx.send(fallback).is_err() {
            debug!(
                event = "core.notify.fallback_dropped",
                reason = "no subscribers",
            );
        }
    }

    /// Forget every baseline (logout, account switch).
    pub fn reset(&self) {
        for detector in self.detectors().values_mut() {
            detector.reset();
        }
        debug!(event = "core.changes.reset_completed");
    }
}
