//! Persisted record of which items the user has seen.

pub mod store;

pub use store::{
    FLUSH_DEBOUNCE, MAX_AGE_DAYS, MAX_ENTRIES, PRUNE_INTERVAL_HOURS, SEEN_STATE_KEY, SeenEntry,
    SeenStateStore,
};
