//! In-memory fakes for every collaborator the core talks to.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::forge::traits::{DataSource, FollowedItemsSource};
use crate::forge::types::{ItemBatch, ItemId, PageInfo, PrState, PullRequestItem, ViewSelector};
use crate::forge::ForgeError;
use crate::notify::{Notification, NotificationSink, NotifyError};
use crate::persistence::{PersistenceError, PersistenceStore};
use crate::views::FollowedPollResult;

/// Pull request `repository#number` with the given activity count.
pub fn item(repository: &str, number: u64, activity_count: u32) -> PullRequestItem {
    PullRequestItem {
        id: ItemId::for_pull_request(repository, number),
        number,
        title: format!("PR {}", number),
        repository: repository.to_string(),
        url: format!("https://github.com/{}/pull/{}", repository, number),
        author: "octocat".to_string(),
        state: PrState::Open,
        activity_count,
        updated_at: None,
    }
}

struct FakeResponse {
    delay: Duration,
    result: Result<ItemBatch, String>,
}

/// Data source answering from a queue of scripted responses; an empty
/// queue answers with an empty batch.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<VecDeque<FakeResponse>>,
    calls: Mutex<Vec<ViewSelector>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, items: Vec<PullRequestItem>) {
        self.push_delayed(Duration::ZERO, Ok(items));
    }

    pub fn push_err(&self, message: &str) {
        self.push_delayed(Duration::ZERO, Err(message.to_string()));
    }

    pub fn push_delayed(&self, delay: Duration, result: Result<Vec<PullRequestItem>, String>) {
        let result = result.map(|items| ItemBatch {
            items,
            page_info: PageInfo::default(),
            failures: Vec::new(),
        });
        self.responses
            .lock()
            .unwrap()
            .push_back(FakeResponse { delay, result });
    }

    pub fn push_batch(&self, batch: ItemBatch) {
        self.responses.lock().unwrap().push_back(FakeResponse {
            delay: Duration::ZERO,
            result: Ok(batch),
        });
    }

    pub fn calls(&self) -> Vec<ViewSelector> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_items(&self, selector: &ViewSelector) -> Result<ItemBatch, ForgeError> {
        self.calls.lock().unwrap().push(selector.clone());
        let response = self.responses.lock().unwrap().pop_front();
        let Some(response) = response else {
            return Ok(ItemBatch::default());
        };

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response
            .result
            .map_err(|message| ForgeError::CliError { message })
    }

    async fn current_user_id(&self) -> Result<String, ForgeError> {
        Ok("octocat".to_string())
    }
}

/// Followed-items source with a settable count and canned poll result.
pub struct FakeFollowed {
    count_tx: watch::Sender<usize>,
    result: Mutex<FollowedPollResult>,
    polls: AtomicUsize,
    resets: AtomicUsize,
}

impl FakeFollowed {
    pub fn new() -> Self {
        Self {
            count_tx: watch::Sender::new(0),
            result: Mutex::new(FollowedPollResult::default()),
            polls: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn set_count(&self, count: usize) {
        self.count_tx.send_replace(count);
    }

    pub fn set_result(&self, result: FollowedPollResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FollowedItemsSource for FakeFollowed {
    fn followed_count(&self) -> usize {
        *self.count_tx.borrow()
    }

    fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    async fn poll_followed_items(&self) -> FollowedPollResult {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

enum SinkMode {
    Available,
    Unavailable,
    Failing,
}

/// Notification sink recording everything it delivers.
pub struct FakeSink {
    mode: SinkMode,
    sent: Mutex<Vec<Notification>>,
}

impl FakeSink {
    fn with_mode(mode: SinkMode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn available() -> Self {
        Self::with_mode(SinkMode::Available)
    }

    pub fn unavailable() -> Self {
        Self::with_mode(SinkMode::Unavailable)
    }

    pub fn failing() -> Self {
        Self::with_mode(SinkMode::Failing)
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for FakeSink {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        !matches!(self.mode, SinkMode::Unavailable)
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self.mode {
            SinkMode::Failing => Err(NotifyError::SendFailed {
                message: "fake failure".to_string(),
            }),
            _ => {
                self.sent.lock().unwrap().push(notification.clone());
                Ok(())
            }
        }
    }
}

/// Memory-backed store counting successful writes; `failing()` rejects
/// every call.
#[derive(Default)]
pub struct RecordingStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Preload a value without counting it as a write.
    pub fn seed(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(std::io::Error::other("disk unavailable").into());
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.seed(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        self.check()?;
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }
}
