//! Registry of platform notification sinks.

use async_trait::async_trait;
use tracing::debug;

use super::backends::{LinuxNotificationSink, MacOsNotificationSink};
use super::errors::NotifyError;
use super::traits::{Notification, NotificationSink};

/// Sink that dispatches to the first available platform backend.
///
/// Registration order in `new()` determines priority.
pub struct PlatformSink {
    backends: Vec<Box<dyn NotificationSink>>,
}

impl PlatformSink {
    pub fn new() -> Self {
        Self {
            backends: vec![
                Box::new(MacOsNotificationSink),
                Box::new(LinuxNotificationSink),
            ],
        }
    }

    /// Detect the first available notification backend.
    fn detect(&self) -> Option<&dyn NotificationSink> {
        self.backends
            .iter()
            .find(|b| b.is_available())
            .map(|b| b.as_ref())
    }
}

impl Default for PlatformSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for PlatformSink {
    fn name(&self) -> &'static str {
        self.detect().map(|b| b.name()).unwrap_or("none")
    }

    fn is_available(&self) -> bool {
        self.detect().is_some()
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(backend) = self.detect() else {
            debug!(
                event = "core.notify.send_skipped",
                reason = "no backend available",
            );
            return Err(NotifyError::Unavailable);
        };

        backend.send(notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_expected_backends() {
        let sink = PlatformSink::new();
        let names: Vec<&str> = sink.backends.iter().map(|b| b.name()).collect();
        assert!(names.contains(&"macos"));
        assert!(names.contains(&"linux"));
    }

    #[test]
    fn name_reports_none_or_detected_backend() {
        let sink = PlatformSink::new();
        let name = sink.name();
        assert!(["macos", "linux", "none"].contains(&name));
        assert_eq!(sink.is_available(), name != "none");
    }
}
