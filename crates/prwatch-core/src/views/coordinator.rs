//! Decides what each trigger refreshes and when results may land.
//!
//! Automatic ticks only poll followed items. A manual refresh polls followed
//! items and then fetches the whole active view. Full-view fetches are
//! tagged with a generation number; a result is committed only if no newer
//! full-view fetch started while it was in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use prwatch_config::PrwatchConfig;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::changes::{FallbackNotification, NotificationGates, NotificationManager};
use crate::forge::traits::{DataSource, FollowedItemsSource};
use crate::forge::types::{ViewDefinition, ViewId};
use crate::host::HostSignals;
use crate::notify::{Notification, NotificationSink};
use crate::polling::{
    PollScheduler, SchedulerConfig, SchedulerHandle, TaskError, poll_task,
};
use crate::views::followed::FollowedPollResult;
use crate::views::registry::ViewRegistry;

/// Quiet period after the last view switch before the new view is polled.
pub const VIEW_SWITCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// External capabilities the coordinator is built from.
pub struct Collaborators {
    pub source: Arc<dyn DataSource>,
    pub followed: Arc<dyn FollowedItemsSource>,
    pub sink: Arc<dyn NotificationSink>,
    pub host: Arc<dyn HostSignals>,
}

/// What happened to the active view during a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRefresh {
    /// No active view, or the active view is virtual.
    Skipped,
    /// The batch landed in the view's snapshot.
    Committed {
        generation: u64,
        notifications: Vec<Notification>,
    },
    /// A newer refresh started meanwhile; the batch was dropped.
    Superseded { generation: u64 },
    /// The fetch failed; the view's `error` holds the message if the
    /// generation was still current.
    Failed { generation: u64, message: String },
}

/// Result of [`ViewPollingCoordinator::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub followed: FollowedPollResult,
    pub view: ViewRefresh,
}

struct Inner {
    source: Arc<dyn DataSource>,
    followed: Arc<dyn FollowedItemsSource>,
    views: Arc<ViewRegistry>,
    notifications: Arc<NotificationManager>,
    generation: AtomicU64,
    /// Generation of the most recent fetch started for each view.
    view_generations: Mutex<HashMap<ViewId, u64>>,
    /// Held for the whole of every followed-items poll, automatic or manual.
    followed_poll: tokio::sync::Mutex<()>,
    definitions: Mutex<HashMap<ViewId, ViewDefinition>>,
    active_view: Mutex<Option<ViewId>>,
    follow_up_enabled: AtomicBool,
    /// Set by `start_polling`, cleared by `stop_polling`.
    polling_requested: AtomicBool,
}

impl Inner {
    fn active_definition(&self) -> Option<ViewDefinition> {
        let active = self
            .active_view
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;
        self.definitions().get(&active).cloned()
    }

    fn definitions(&self) -> MutexGuard<'_, HashMap<ViewId, ViewDefinition>> {
        self.definitions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn view_generations(&self) -> MutexGuard<'_, HashMap<ViewId, u64>> {
        self.view_generations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Whether no fetch of `view` started after `generation`.
    fn is_latest_for_view(&self, view: &ViewId, generation: u64) -> bool {
        self.view_generations().get(view).copied() == Some(generation)
    }

    /// A dropped result still ends the view's loading state unless a newer
    /// fetch of the same view is running.
    fn settle_stale(&self, view: &ViewId, generation: u64) {
        if self.is_latest_for_view(view, generation) {
            self.views.update(view, |snapshot| snapshot.loading = false);
        }
    }

    fn auto_polling_wanted(&self) -> bool {
        self.polling_requested.load(Ordering::SeqCst)
            && self.follow_up_enabled.load(Ordering::SeqCst)
            && self.followed.followed_count() > 0
    }

    /// Start or stop the scheduler to match the follow-up state.
    async fn sync_scheduler(&self, scheduler: &SchedulerHandle) {
        let wanted = self.auto_polling_wanted();
        let running = scheduler.running();
        let result = if wanted && !running {
            debug!(event = "core.views.auto_polling_resumed");
            scheduler.start().await
        } else if !wanted && running {
            debug!(event = "core.views.auto_polling_paused");
            scheduler.stop().await
        } else {
            Ok(())
        };
        if let Err(e) = result {
            warn!(event = "core.views.scheduler_sync_failed", error = %e);
        }
    }

    /// Scheduler task: followed items only.
    async fn auto_tick(&self) -> Result<(), TaskError> {
        if !self.follow_up_enabled.load(Ordering::SeqCst) {
            debug!(event = "core.views.auto_tick_skipped", reason = "follow-up disabled");
            return Ok(());
        }
        if self.followed.followed_count() == 0 {
            debug!(event = "core.views.auto_tick_skipped", reason = "nothing followed");
            return Ok(());
        }

        let Ok(_guard) = self.followed_poll.try_lock() else {
            debug!(event = "core.views.auto_tick_skipped", reason = "followed poll in flight");
            return Ok(());
        };

        let result = self.poll_followed().await;
        if result.checked == 0 && !result.errors.is_empty() {
            return Err(TaskError::new(result.errors.join("; ")));
        }
        Ok(())
    }

    /// Callers hold `followed_poll`.
    async fn poll_followed(&self) -> FollowedPollResult {
        let mut result = self.followed.poll_followed_items().await;
        result.notifications_created = self
            .notifications
            .admitted(std::mem::take(&mut result.notifications_created));
        for notification in &result.notifications_created {
            self.notifications.deliver(notification).await;
        }
        for error in &result.errors {
            warn!(event = "core.views.followed_poll_failed", error = %error);
        }
        result
    }

    async fn refresh_active_view(&self) -> ViewRefresh {
        match self.active_definition() {
            Some(definition) if !definition.is_virtual() => self.refresh_view(&definition).await,
            Some(definition) => {
                debug!(
                    event = "core.views.refresh_skipped",
                    view_id = %definition.id,
                    reason = "virtual view",
                );
                ViewRefresh::Skipped
            }
            None => ViewRefresh::Skipped,
        }
    }

    async fn refresh_view(&self, definition: &ViewDefinition) -> ViewRefresh {
        let view_id = &definition.id;
        let generation = {
            let mut latest = self.view_generations();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            latest.insert(view_id.clone(), generation);
            generation
        };

        info!(
            event = "core.views.refresh_started",
            view_id = %view_id,
            generation = generation,
        );
        self.views.update(view_id, |view| view.loading = true);

        let fetched = self.source.fetch_items(&definition.selector).await;
        let current = self.generation.load(Ordering::SeqCst) == generation;

        match fetched {
            Ok(batch) if current => {
                let changes = self.notifications.detect(view_id, &batch.items);
                let count = batch.items.len();
                self.views.update(view_id, |view| {
                    view.items = batch.items;
                    view.page_info = batch.page_info;
                    view.loading = false;
                    view.error = None;
                    view.last_fetched_at = Some(Utc::now());
                });
                info!(
                    event = "core.views.refresh_completed",
                    view_id = %view_id,
                    generation = generation,
                    items = count,
                );
                let notifications = self.notifications.notify_changes(&changes).await;
                ViewRefresh::Committed {
                    generation,
                    notifications,
                }
            }
            Ok(_) => {
                debug!(
                    event = "core.views.refresh_discarded",
                    view_id = %view_id,
                    generation = generation,
                    reason = "superseded",
                );
                self.settle_stale(view_id, generation);
                ViewRefresh::Superseded { generation }
            }
            Err(e) => {
                let message = e.to_string();
                if current {
                    warn!(
                        event = "core.views.refresh_failed",
                        view_id = %view_id,
                        generation = generation,
                        error = %message,
                    );
                    self.views.update(view_id, |view| {
                        view.loading = false;
                        view.error = Some(message.clone());
                    });
                } else {
                    debug!(
                        event = "core.views.refresh_discarded",
                        view_id = %view_id,
                        generation = generation,
                        reason = "superseded",
                        error = %message,
                    );
                    self.settle_stale(view_id, generation);
                }
                ViewRefresh::Failed {
                    generation,
                    message,
                }
            }
        }
    }
}

/// Composes one [`PollScheduler`] with a data source, the followed-items
/// source and a [`NotificationManager`].
pub struct ViewPollingCoordinator {
    inner: Arc<Inner>,
    scheduler_handle: SchedulerHandle,
    scheduler: Option<PollScheduler>,
    follow_watcher: Option<JoinHandle<()>>,
    switch_debounce: Mutex<Option<JoinHandle<()>>>,
}

impl ViewPollingCoordinator {
    /// Build the coordinator. Must be called within a Tokio runtime.
    ///
    /// The first definition becomes the active view. Automatic polling does
    /// not begin until [`start_polling`](Self::start_polling).
    pub fn new(
        collaborators: Collaborators,
        config: &PrwatchConfig,
        definitions: Vec<ViewDefinition>,
    ) -> Self {
        let gates = NotificationGates::from(&config.notifications);
        let notifications = Arc::new(NotificationManager::new(gates, collaborators.sink));
        let active_view = definitions.first().map(|d| d.id.clone());

        let inner = Arc::new(Inner {
            source: collaborators.source,
            followed: collaborators.followed,
            views: Arc::new(ViewRegistry::new()),
            notifications,
            generation: AtomicU64::new(0),
            view_generations: Mutex::new(HashMap::new()),
            followed_poll: tokio::sync::Mutex::new(()),
            definitions: Mutex::new(
                definitions
                    .into_iter()
                    .map(|d| (d.id.clone(), d))
                    .collect(),
            ),
            active_view: Mutex::new(active_view),
            follow_up_enabled: AtomicBool::new(config.follow_up.enabled()),
            polling_requested: AtomicBool::new(false),
        });

        let task_inner = inner.clone();
        let task = poll_task(move || {
            let inner = task_inner.clone();
            async move { inner.auto_tick().await }
        });
        let scheduler = PollScheduler::new(
            SchedulerConfig::from_polling(&config.polling).with_immediate(false),
            collaborators.host,
            task,
        );
        let scheduler_handle = scheduler.handle();

        let follow_watcher = tokio::spawn({
            let inner = inner.clone();
            let scheduler = scheduler_handle.clone();
            let mut count = inner.followed.subscribe_count();
            async move {
                loop {
                    let followed = *count.borrow_and_update();
                    debug!(event = "core.views.followed_count_changed", count = followed);
                    inner.sync_scheduler(&scheduler).await;
                    if count.changed().await.is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            inner,
            scheduler_handle,
            scheduler: Some(scheduler),
            follow_watcher: Some(follow_watcher),
            switch_debounce: Mutex::new(None),
        }
    }

    /// Enable automatic ticks. The scheduler actually runs only while
    /// follow-up is enabled and at least one item is followed.
    pub async fn start_polling(&self) {
        self.inner.polling_requested.store(true, Ordering::SeqCst);
        self.inner.sync_scheduler(&self.scheduler_handle).await;
    }

    pub async fn stop_polling(&self) {
        self.inner.polling_requested.store(false, Ordering::SeqCst);
        self.inner.sync_scheduler(&self.scheduler_handle).await;
    }

    /// Manual refresh: followed items first (their notifications are
    /// delivered before this returns), then the full active view.
    ///
    /// An automatic followed-items poll already in flight is awaited before
    /// the manual one starts; the two never overlap.
    pub async fn refresh(&self) -> RefreshOutcome {
        let followed = if self.inner.follow_up_enabled.load(Ordering::SeqCst)
            && self.inner.followed.followed_count() > 0
        {
            let _guard = self.inner.followed_poll.lock().await;
            self.inner.poll_followed().await
        } else {
            FollowedPollResult::default()
        };

        let view = self.inner.refresh_active_view().await;
        RefreshOutcome { followed, view }
    }

    /// Fetch one defined view without touching the active view or followed
    /// items. Shares the generation counter with every other full-view fetch.
    pub async fn refresh_view(&self, view: &ViewId) -> ViewRefresh {
        let definition = self.inner.definitions().get(view).cloned();
        match definition {
            Some(definition) if !definition.is_virtual() => {
                self.inner.refresh_view(&definition).await
            }
            _ => {
                debug!(
                    event = "core.views.refresh_skipped",
                    view_id = %view,
                    reason = "unknown or virtual view",
                );
                ViewRefresh::Skipped
            }
        }
    }

    /// Switch the active view. While the scheduler runs, the new view is
    /// fetched once switching has been quiet for [`VIEW_SWITCH_DEBOUNCE`].
    pub fn set_active_view(&self, view: ViewId) {
        *self
            .inner
            .active_view
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(view.clone());

        let inner = self.inner.clone();
        let scheduler = self.scheduler_handle.clone();
        let debounce = tokio::spawn(async move {
            tokio::time::sleep(VIEW_SWITCH_DEBOUNCE).await;
            if !scheduler.running() {
                debug!(
                    event = "core.views.switch_poll_skipped",
                    view_id = %view,
                    reason = "scheduler stopped",
                );
                return;
            }
            // Detached so a later switch cannot abort a fetch in flight.
            tokio::spawn(async move {
                inner.refresh_active_view().await;
            });
        });

        let mut pending = self
            .switch_debounce
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(debounce) {
            previous.abort();
        }
    }

    pub fn active_view(&self) -> Option<ViewId> {
        self.inner
            .active_view
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Register or replace a view definition.
    pub fn define_view(&self, definition: ViewDefinition) {
        self.inner
            .definitions()
            .insert(definition.id.clone(), definition);
    }

    pub fn views(&self) -> Arc<ViewRegistry> {
        self.inner.views.clone()
    }

    pub fn scheduler(&self) -> SchedulerHandle {
        self.scheduler_handle.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn subscribe_fallback(&self) -> broadcast::Receiver<FallbackNotification> {
        self.inner.notifications.subscribe_fallback()
    }

    pub async fn set_follow_up_enabled(&self, enabled: bool) {
        self.inner.follow_up_enabled.store(enabled, Ordering::SeqCst);
        self.inner.sync_scheduler(&self.scheduler_handle).await;
    }

    /// Apply a reloaded configuration to the running coordinator.
    pub async fn apply_config(&self, config: &PrwatchConfig) {
        self.inner
            .notifications
            .set_gates(NotificationGates::from(&config.notifications));

        let scheduler = &self.scheduler_handle;
        let polling = SchedulerConfig::from_polling(&config.polling);
        let results = [
            scheduler.set_enabled(polling.enabled).await,
            scheduler
                .set_background_allowed(polling.background_allowed)
                .await,
            scheduler.set_interval(polling.interval).await,
        ];
        for result in results {
            if let Err(e) = result {
                warn!(event = "core.views.config_apply_failed", error = %e);
            }
        }

        self.set_follow_up_enabled(config.follow_up.enabled()).await;
        info!(event = "core.views.config_applied");
    }

    /// Logout/account switch: in-flight fetches become stale, change
    /// baselines go cold and all view state is dropped.
    pub fn reset_session(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.view_generations().clear();
        self.inner.notifications.reset();
        self.inner.followed.reset();
        self.inner.views.reset_all();
        info!(event = "core.views.session_reset");
    }

    /// Stop polling and tear down the scheduler and background tasks.
    pub async fn shutdown(mut self) {
        if let Some(watcher) = self.follow_watcher.take() {
            watcher.abort();
        }
        if let Some(debounce) = self
            .switch_debounce
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            debounce.abort();
        }
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
        info!(event = "core.views.shutdown_completed");
    }
}

impl Drop for ViewPollingCoordinator {
    fn drop(&mut self) {
        if let Some(watcher) = self.follow_watcher.take() {
            watcher.abort();
        }
        if let Some(debounce) = self
            .switch_debounce
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            debounce.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::types::{ItemId, ViewSelector};
    use crate::host::HostSignalsHandle;
    use crate::test_support::{FakeFollowed, FakeSink, FakeSource, item};
    use crate::views::{FollowedItemsTracker, FollowedPollResult};
    use tokio::time::{Instant, sleep_until};

    struct Harness {
        source: Arc<FakeSource>,
        followed: Arc<FakeFollowed>,
        sink: Arc<FakeSink>,
        coordinator: ViewPollingCoordinator,
    }

    fn harness_with(config: PrwatchConfig, definitions: Vec<ViewDefinition>) -> Harness {
        let source = Arc::new(FakeSource::new());
        let followed = Arc::new(FakeFollowed::new());
        let sink = Arc::new(FakeSink::available());
        let coordinator = ViewPollingCoordinator::new(
            Collaborators {
                source: source.clone(),
                followed: followed.clone(),
                sink: sink.clone(),
                host: Arc::new(HostSignalsHandle::default()),
            },
            &config,
            definitions,
        );
        Harness {
            source,
            followed,
            sink,
            coordinator,
        }
    }

    fn harness() -> Harness {
        harness_with(
            PrwatchConfig::default(),
            vec![
                ViewDefinition::remote("mine", ViewSelector::repository("acme/w")),
                ViewDefinition::remote("other", ViewSelector::repository("acme/x")),
                ViewDefinition::virtual_view("inbox"),
            ],
        )
    }

    /// Coordinator over a real tracker following `acme/w#1`, with a single
    /// virtual view so only followed items are fetched.
    struct TrackedHarness {
        source: Arc<FakeSource>,
        sink: Arc<FakeSink>,
        coordinator: ViewPollingCoordinator,
    }

    fn tracked_harness(config: PrwatchConfig) -> TrackedHarness {
        let source = Arc::new(FakeSource::new());
        let tracker = Arc::new(FollowedItemsTracker::new(source.clone()));
        tracker.follow(ItemId::from("acme/w#1"));
        let sink = Arc::new(FakeSink::available());
        let coordinator = ViewPollingCoordinator::new(
            Collaborators {
                source: source.clone(),
                followed: tracker,
                sink: sink.clone(),
                host: Arc::new(HostSignalsHandle::default()),
            },
            &config,
            vec![ViewDefinition::virtual_view("inbox")],
        );
        TrackedHarness {
            source,
            sink,
            coordinator,
        }
    }

    async fn at(start: Instant, ms: u64) {
        sleep_until(start + Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_commits_active_view() {
        let h = harness();
        h.source.push_ok(vec![item("acme/w", 1, 0), item("acme/w", 2, 3)]);

        let outcome = h.coordinator.refresh().await;
        assert!(matches!(
            outcome.view,
            ViewRefresh::Committed { generation: 1, .. }
        ));

        let view = h.coordinator.views().get(&ViewId::from("mine"));
        assert_eq!(view.items.len(), 2);
        assert!(!view.loading);
        assert_eq!(view.error, None);
        assert!(view.last_fetched_at.is_some());
        assert_eq!(
            h.source.calls()[0].repository.as_deref(),
            Some("acme/w")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_delivers_followed_notifications_first() {
        let h = harness();
        h.followed.set_count(1);
        h.followed.set_result(FollowedPollResult {
            checked: 1,
            changes_detected: 1,
            notifications_created: vec![Notification::new("New activity", "1 new comment")],
            errors: Vec::new(),
        });
        h.source.push_ok(vec![]);

        let outcome = h.coordinator.refresh().await;
        assert_eq!(outcome.followed.checked, 1);
        assert_eq!(h.followed.polls(), 1);
        assert_eq!(h.sink.sent().len(), 1);
        assert_eq!(h.sink.sent()[0].title, "New activity");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_view_fetches_named_view_only() {
        let h = harness();
        h.followed.set_count(1);
        h.source.push_ok(vec![item("acme/x", 9, 0)]);

        let other = ViewId::from("other");
        let refresh = h.coordinator.refresh_view(&other).await;
        assert!(matches!(refresh, ViewRefresh::Committed { generation: 1, .. }));
        assert_eq!(h.coordinator.active_view(), Some(ViewId::from("mine")));
        assert_eq!(h.followed.polls(), 0);
        assert_eq!(h.coordinator.views().get(&other).items.len(), 1);

        let unknown = h.coordinator.refresh_view(&ViewId::from("nope")).await;
        assert_eq!(unknown, ViewRefresh::Skipped);
        let inbox = h.coordinator.refresh_view(&ViewId::from("inbox")).await;
        assert_eq!(inbox, ViewRefresh::Skipped);
        assert_eq!(h.source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_virtual_view_is_never_fetched() {
        let h = harness();
        h.coordinator.set_active_view(ViewId::from("inbox"));

        let outcome = h.coordinator.refresh().await;
        assert_eq!(outcome.view, ViewRefresh::Skipped);
        assert!(h.source.calls().is_empty());
        assert_eq!(h.coordinator.generation(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_discarded() {
        let h = harness();
        // First refresh resolves late, second one early.
        h.source
            .push_delayed(Duration::from_millis(200), Ok(vec![item("acme/w", 1, 0)]));
        h.source
            .push_delayed(Duration::from_millis(50), Ok(vec![item("acme/w", 2, 0)]));

        let t0 = Instant::now();
        let (first, second) = tokio::join!(h.coordinator.refresh(), async {
            at(t0, 50).await;
            h.coordinator.refresh().await
        });

        assert_eq!(first.view, ViewRefresh::Superseded { generation: 1 });
        assert!(matches!(
            second.view,
            ViewRefresh::Committed { generation: 2, .. }
        ));
        let view = h.coordinator.views().get(&ViewId::from("mine"));
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].id.as_str(), "acme/w#2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_error_does_not_touch_view() {
        let h = harness();
        h.source
            .push_delayed(Duration::from_millis(200), Err("timeout".to_string()));
        h.source
            .push_delayed(Duration::from_millis(50), Ok(vec![item("acme/w", 2, 0)]));

        let t0 = Instant::now();
        let (first, _) = tokio::join!(h.coordinator.refresh(), async {
            at(t0, 50).await;
            h.coordinator.refresh().await
        });

        assert!(matches!(first.view, ViewRefresh::Failed { generation: 1, .. }));
        let view = h.coordinator.views().get(&ViewId::from("mine"));
        assert_eq!(view.error, None);
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_by_other_view_clears_loading() {
        let h = harness();
        h.source
            .push_delayed(Duration::from_millis(200), Ok(vec![item("acme/w", 1, 0)]));
        h.source
            .push_delayed(Duration::from_millis(50), Ok(vec![item("acme/x", 2, 0)]));

        let mine = ViewId::from("mine");
        let other = ViewId::from("other");
        let t0 = Instant::now();
        let (first, second) = tokio::join!(h.coordinator.refresh_view(&mine), async {
            at(t0, 10).await;
            h.coordinator.refresh_view(&other).await
        });

        assert_eq!(first, ViewRefresh::Superseded { generation: 1 });
        assert!(matches!(second, ViewRefresh::Committed { generation: 2, .. }));
        assert!(!h.coordinator.views().get(&mine).loading);
        assert!(!h.coordinator.views().get(&other).loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failure_keeps_loading_for_newer_fetch() {
        let h = harness();
        h.source
            .push_delayed(Duration::from_millis(50), Err("timeout".to_string()));
        h.source
            .push_delayed(Duration::from_millis(200), Ok(vec![item("acme/w", 1, 0)]));

        let mine = ViewId::from("mine");
        let t0 = Instant::now();
        let (first, second, loading_midway) = tokio::join!(
            h.coordinator.refresh_view(&mine),
            async {
                at(t0, 10).await;
                h.coordinator.refresh_view(&mine).await
            },
            async {
                at(t0, 100).await;
                h.coordinator.views().get(&mine).loading
            },
        );

        assert!(matches!(first, ViewRefresh::Failed { generation: 1, .. }));
        assert!(matches!(second, ViewRefresh::Committed { generation: 2, .. }));
        assert!(loading_midway);
        assert!(!h.coordinator.views().get(&mine).loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_sets_view_error() {
        let h = harness();
        h.source.push_err("API rate limit exceeded");

        let outcome = h.coordinator.refresh().await;
        assert!(matches!(outcome.view, ViewRefresh::Failed { .. }));
        let view = h.coordinator.views().get(&ViewId::from("mine"));
        assert_eq!(
            view.error.as_deref(),
            Some("Forge CLI error: API rate limit exceeded")
        );
        assert!(!view.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_refresh_notifies_new_items() {
        let h = harness();
        h.source.push_ok(vec![item("acme/w", 1, 0)]);
        h.coordinator.refresh().await;
        assert!(h.sink.sent().is_empty());

        h.source
            .push_ok(vec![item("acme/w", 1, 0), item("acme/w", 2, 0)]);
        let outcome = h.coordinator.refresh().await;
        match outcome.view {
            ViewRefresh::Committed { notifications, .. } => {
                assert_eq!(notifications.len(), 1);
                assert_eq!(notifications[0].title, "New pull request");
            }
            other => panic!("expected commit, got {:?}", other),
        }
        assert_eq!(h.sink.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_follows_followed_count() {
        let h = harness();
        let t0 = Instant::now();
        h.coordinator.start_polling().await;
        at(t0, 1).await;
        assert!(!h.coordinator.scheduler().running());

        h.followed.set_count(2);
        at(t0, 2).await;
        assert!(h.coordinator.scheduler().running());

        h.followed.set_count(0);
        at(t0, 3).await;
        assert!(!h.coordinator.scheduler().running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_tick_polls_followed_items_only() {
        let h = harness();
        h.followed.set_count(1);
        let t0 = Instant::now();
        h.coordinator.start_polling().await;

        // Default interval is 60s, first tick after one full interval.
        at(t0, 59_000).await;
        assert_eq!(h.followed.polls(), 0);
        at(t0, 60_001).await;
        assert_eq!(h.followed.polls(), 1);
        at(t0, 120_002).await;
        assert_eq!(h.followed.polls(), 2);
        assert!(h.source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_disabled_keeps_scheduler_stopped() {
        let mut config = PrwatchConfig::default();
        config.follow_up.enabled = Some(false);
        let h = harness_with(
            config,
            vec![ViewDefinition::remote("mine", ViewSelector::repository("acme/w"))],
        );
        h.followed.set_count(3);

        let t0 = Instant::now();
        h.coordinator.start_polling().await;
        at(t0, 120_000).await;
        assert!(!h.coordinator.scheduler().running());
        assert_eq!(h.followed.polls(), 0);

        h.coordinator.set_follow_up_enabled(true).await;
        assert!(h.coordinator.scheduler().running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_switch_is_debounced() {
        let h = harness();
        h.followed.set_count(1);
        let t0 = Instant::now();
        h.coordinator.start_polling().await;

        h.coordinator.set_active_view(ViewId::from("other"));
        at(t0, 100).await;
        h.coordinator.set_active_view(ViewId::from("mine"));
        at(t0, 200).await;
        h.coordinator.set_active_view(ViewId::from("other"));

        at(t0, 499).await;
        assert!(h.source.calls().is_empty());

        at(t0, 501).await;
        let calls = h.source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].repository.as_deref(), Some("acme/x"));
        assert_eq!(h.coordinator.active_view(), Some(ViewId::from("other")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_switch_without_running_scheduler_does_not_fetch() {
        let h = harness();
        let t0 = Instant::now();
        h.coordinator.set_active_view(ViewId::from("other"));
        at(t0, 1000).await;
        assert!(h.source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_session_drops_state_and_in_flight_results() {
        let h = harness();
        h.source.push_ok(vec![item("acme/w", 1, 0)]);
        h.coordinator.refresh().await;

        h.source
            .push_delayed(Duration::from_millis(100), Ok(vec![item("acme/w", 9, 0)]));
        let t0 = Instant::now();
        let (late, _) = tokio::join!(h.coordinator.refresh(), async {
            at(t0, 10).await;
            h.coordinator.reset_session();
        });

        assert!(matches!(late.view, ViewRefresh::Superseded { .. }));
        assert!(!h.coordinator.views().contains(&ViewId::from("mine")));
        assert_eq!(h.followed.resets(), 1);

        // Detector is cold again: the next batch is a baseline.
        h.source
            .push_ok(vec![item("other/r", 1, 0), item("other/r", 2, 0)]);
        h.coordinator.refresh().await;
        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_config_updates_interval() {
        let h = harness();
        h.followed.set_count(1);
        h.coordinator.start_polling().await;

        let mut config = PrwatchConfig::default();
        config.polling.interval_seconds = Some(120);
        h.coordinator.apply_config(&config).await;

        let status = h.coordinator.scheduler().status();
        assert!(status.running);
        assert_eq!(status.interval, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_waits_for_tick_in_flight() {
        let mut config = PrwatchConfig::default();
        config.polling.interval_seconds = Some(1);
        let h = tracked_harness(config);

        h.source.push_ok(vec![item("acme/w", 1, 0)]);
        h.coordinator.refresh().await;
        assert!(h.sink.sent().is_empty());

        h.source
            .push_delayed(Duration::from_millis(500), Ok(vec![item("acme/w", 1, 1)]));
        h.source.push_ok(vec![item("acme/w", 1, 3)]);
        h.source.push_ok(vec![item("acme/w", 1, 3)]);

        let t0 = Instant::now();
        h.coordinator.start_polling().await;

        // Tick at 1000 fetches slowly; the manual refresh lands mid-fetch.
        at(t0, 1100).await;
        let outcome = h.coordinator.refresh().await;
        assert_eq!(outcome.followed.notifications_created.len(), 1);

        at(t0, 3000).await;
        let bodies: Vec<String> = h.sink.sent().into_iter().map(|n| n.body).collect();
        assert_eq!(
            bodies,
            vec![
                "1 new comment on #1 PR 1".to_string(),
                "2 new comments on #1 PR 1".to_string(),
            ]
        );
        assert_eq!(h.source.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_config_gates_followed_activity() {
        let h = tracked_harness(PrwatchConfig::default());
        h.source.push_ok(vec![item("acme/w", 1, 0)]);
        h.coordinator.refresh().await;

        let mut config = PrwatchConfig::default();
        config.notifications.on_new_activity = Some(false);
        h.coordinator.apply_config(&config).await;

        h.source.push_ok(vec![item("acme/w", 1, 4)]);
        let outcome = h.coordinator.refresh().await;
        assert_eq!(outcome.followed.changes_detected, 1);
        assert!(outcome.followed.notifications_created.is_empty());
        assert!(h.sink.sent().is_empty());

        // Gates re-opened: the next growth is reported again.
        h.coordinator.apply_config(&PrwatchConfig::default()).await;
        h.source.push_ok(vec![item("acme/w", 1, 5)]);
        h.coordinator.refresh().await;
        assert_eq!(h.sink.sent().len(), 1);
        assert_eq!(h.sink.sent()[0].body, "1 new comment on #1 PR 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_scheduler() {
        let h = harness();
        h.followed.set_count(1);
        h.coordinator.start_polling().await;
        let scheduler = h.coordinator.scheduler();

        h.coordinator.shutdown().await;
        assert!(scheduler.start().await.is_err());
    }
}
