//! Notification sink trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::notify::errors::NotifyError;

/// What a notification announces; the notification gates are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    General,
    NewItem,
    NewActivity,
}

impl NotificationKind {
    fn is_general(&self) -> bool {
        *self == NotificationKind::General
    }
}

/// A user-facing notification, platform independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "NotificationKind::is_general")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind: NotificationKind::General,
            subtitle: None,
            url: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Trait for delivering notifications through a platform channel.
///
/// Each platform (macOS, Linux) implements this trait; tests inject fakes.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// The canonical name of this sink (e.g., "macos", "linux").
    fn name(&self) -> &'static str;

    /// Whether the platform channel can be used right now.
    fn is_available(&self) -> bool;

    /// Deliver a notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
