//! Platform-native desktop notification delivery.
//!
//! Notifications are dispatched via the [`NotificationSink`] trait, with
//! platform-specific sinks registered in [`registry::PlatformSink`]. Callers
//! that must still inform the user when delivery fails go through
//! [`crate::changes::NotificationManager`], which raises a fallback event.

pub mod backends;
pub mod errors;
pub mod registry;
pub mod traits;

pub use errors::NotifyError;
pub use registry::PlatformSink;
pub use traits::{Notification, NotificationKind, NotificationSink};
