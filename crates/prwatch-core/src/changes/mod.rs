//! Turning consecutive item batches into user notifications.

pub mod detector;
pub mod manager;
pub mod messages;

pub use detector::{ActivityChange, ActivitySnapshot, ChangeDetector, ChangeSet};
pub use manager::{FallbackNotification, NotificationManager};
pub use messages::NotificationGates;
