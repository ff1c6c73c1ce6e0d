//! Per-category TTL cache keyed by item id.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use prwatch_config::PrefetchConfig;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{PrefetchCategory, PrefetchFetcher};
use crate::forge::types::ItemId;

/// Hover must last this long before anything is fetched.
pub const HOVER_DEBOUNCE: Duration = Duration::from_millis(150);

/// Entries older than this are treated as absent.
pub const TTL: Duration = Duration::from_secs(5 * 60);

/// Entries per category.
pub const MAX_CACHE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CategoryCache {
    entries: HashMap<ItemId, CacheEntry>,
}

impl CategoryCache {
    /// Lazy expiry: an entry past its TTL is removed and reported missing.
    fn get(&mut self, id: &ItemId, ttl: Duration) -> Option<&CacheEntry> {
        let expired = self
            .entries
            .get(id)
            .is_some_and(|entry| entry.inserted_at.elapsed() > ttl);
        if expired {
            self.entries.remove(id);
            debug!(event = "core.prefetch.entry_expired", item_id = %id);
            return None;
        }
        self.entries.get(id)
    }

    fn insert(&mut self, id: ItemId, value: serde_json::Value, max_size: usize) {
        if !self.entries.contains_key(&id) && self.entries.len() >= max_size {
            self.evict_oldest((max_size / 5).max(1));
        }
        self.entries.insert(
            id,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<(Instant, ItemId)> = self
            .entries
            .iter()
            .map(|(id, entry)| (entry.inserted_at, id.clone()))
            .collect();
        by_age.sort();
        for (_, id) in by_age.into_iter().take(count) {
            self.entries.remove(&id);
        }
        debug!(event = "core.prefetch.evicted", count = count);
    }
}

struct CacheInner {
    fetcher: Arc<dyn PrefetchFetcher>,
    categories: Mutex<HashMap<PrefetchCategory, CategoryCache>>,
    ttl: Duration,
    max_size: usize,
}

impl CacheInner {
    fn categories(&self) -> MutexGuard<'_, HashMap<PrefetchCategory, CategoryCache>> {
        self.categories.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_cached(&self, id: &ItemId, category: PrefetchCategory) -> bool {
        self.categories()
            .get_mut(&category)
            .is_some_and(|cache| cache.get(id, self.ttl).is_some())
    }

    fn insert(&self, id: ItemId, category: PrefetchCategory, value: serde_json::Value) {
        self.categories()
            .entry(category)
            .or_default()
            .insert(id, value, self.max_size);
    }

    /// Fetch every hinted category that is not validly cached, concurrently.
    async fn prefetch(&self, id: ItemId, hints: Vec<PrefetchCategory>) {
        let wanted: BTreeSet<PrefetchCategory> = hints
            .into_iter()
            .filter(|category| !self.is_cached(&id, *category))
            .collect();
        if wanted.is_empty() {
            return;
        }

        debug!(
            event = "core.prefetch.fetch_started",
            item_id = %id,
            categories = ?wanted,
        );

        let fetches = wanted.iter().map(|category| {
            let id = &id;
            async move { (*category, self.fetcher.fetch(id, *category).await) }
        });

        for (category, result) in join_all(fetches).await {
            match result {
                Ok(value) => self.insert(id.clone(), category, value),
                Err(e) => {
                    warn!(
                        event = "core.prefetch.fetch_failed",
                        item_id = %id,
                        category = %category,
                        error = %e,
                    );
                }
            }
        }
    }
}

/// Speculative prefetch cache driven by hover intent.
///
/// A hover must outlast [`HOVER_DEBOUNCE`] before its item is fetched; a
/// hover end inside the window cancels the timer. Once started, a fetch
/// runs to completion even if the hover ends.
pub struct PrefetchCache {
    inner: Arc<CacheInner>,
    enabled: AtomicBool,
    pending_hover: Mutex<Option<JoinHandle<()>>>,
}

impl PrefetchCache {
    pub fn new(fetcher: Arc<dyn PrefetchFetcher>, config: &PrefetchConfig) -> Self {
        Self::with_limits(fetcher, config, TTL, MAX_CACHE_SIZE)
    }

    pub fn with_limits(
        fetcher: Arc<dyn PrefetchFetcher>,
        config: &PrefetchConfig,
        ttl: Duration,
        max_size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                categories: Mutex::new(HashMap::new()),
                ttl,
                max_size,
            }),
            enabled: AtomicBool::new(config.on_hover_enabled()),
            pending_hover: Mutex::new(None),
        }
    }

    fn pending_hover(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_hover.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.on_hover_end();
        }
    }

    /// Start (or restart) the hover timer for `id`. `hints` lists the
    /// categories the item actually has data for.
    pub fn on_hover_start(&self, id: ItemId, hints: &[PrefetchCategory]) {
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }

        let inner = self.inner.clone();
        let hints = hints.to_vec();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(HOVER_DEBOUNCE).await;
            // Detached so a hover end cannot abort a fetch in flight.
            tokio::spawn(async move { inner.prefetch(id, hints).await });
        });

        if let Some(previous) = self.pending_hover().replace(timer) {
            previous.abort();
        }
    }

    /// Cancel a pending hover timer outright.
    pub fn on_hover_end(&self) {
        if let Some(pending) = self.pending_hover().take() {
            pending.abort();
        }
    }

    pub fn is_cached(&self, id: &ItemId, category: PrefetchCategory) -> bool {
        self.inner.is_cached(id, category)
    }

    pub fn get(&self, id: &ItemId, category: PrefetchCategory) -> Option<serde_json::Value> {
        self.inner
            .categories()
            .get_mut(&category)
            .and_then(|cache| cache.get(id, self.inner.ttl).map(|e| e.value.clone()))
    }

    /// Store a value fetched elsewhere (e.g. when the item is opened).
    pub fn insert(&self, id: ItemId, category: PrefetchCategory, value: serde_json::Value) {
        self.inner.insert(id, category, value);
    }

    /// Entries held for `category`, expired ones included until read.
    pub fn len(&self, category: PrefetchCategory) -> usize {
        self.inner
            .categories()
            .get(&category)
            .map_or(0, |cache| cache.entries.len())
    }

    pub fn clear(&self) {
        self.on_hover_end();
        self.inner.categories().clear();
        debug!(event = "core.prefetch.cleared");
    }
}

impl Drop for PrefetchCache {
    fn drop(&mut self) {
        self.on_hover_end();
    }
}
