//! Configuration type definitions for prwatch.
//!
//! These types are serialized/deserialized from TOML config files. Every
//! leaf field is `Option<T>` so that the user/project hierarchy can merge
//! field-by-field: only explicitly-set values override lower-priority configs.
//! Accessor methods supply the defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [polling]
//! enabled = true
//! interval_seconds = 120
//! background_enabled = false
//!
//! [notifications]
//! on_new_activity = false
//!
//! [prefetch]
//! on_hover_enabled = true
//!
//! [follow_up]
//! enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration loaded from TOML config files.
///
/// Loaded from:
/// 1. User config: `~/.prwatch/config.toml`
/// 2. Project config: `./.prwatch/config.toml`
///
/// Project config values override user config values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrwatchConfig {
    /// `[polling]` section: scheduler cadence and host-visibility behavior.
    pub polling: PollingConfig,
    /// `[notifications]` section: which change events reach the user.
    pub notifications: NotificationConfig,
    /// `[prefetch]` section: hover-intent speculative fetching.
    pub prefetch: PrefetchConfig,
    /// `[follow_up]` section: background tracking of followed items.
    pub follow_up: FollowUpConfig,
}

impl PrwatchConfig {
    /// Merge two configs. `override_config` values take precedence.
    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            polling: PollingConfig::merge(&base.polling, &override_config.polling),
            notifications: NotificationConfig::merge(
                &base.notifications,
                &override_config.notifications,
            ),
            prefetch: PrefetchConfig::merge(&base.prefetch, &override_config.prefetch),
            follow_up: FollowUpConfig::merge(&base.follow_up, &override_config.follow_up),
        }
    }
}

/// `[polling]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Whether automatic polling runs at all.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Seconds between the end of one poll cycle and the start of the next.
    /// Default: 60
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,

    /// Keep polling while the host is hidden/backgrounded.
    /// Default: false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_enabled: Option<bool>,

    /// Seconds a single poll cycle may run before it is abandoned.
    /// Default: 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl PollingConfig {
    /// Returns whether polling is enabled, defaulting to true.
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Returns the interval in seconds, defaulting to 60.
    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds.unwrap_or(60)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds())
    }

    /// Returns whether background polling is allowed, defaulting to false.
    pub fn background_enabled(&self) -> bool {
        self.background_enabled.unwrap_or(false)
    }

    /// Returns the per-cycle timeout in seconds, defaulting to 30.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds())
    }

    /// Merge two polling configs. Override takes precedence for set fields.
    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            enabled: override_config.enabled.or(base.enabled),
            interval_seconds: override_config.interval_seconds.or(base.interval_seconds),
            background_enabled: override_config
                .background_enabled
                .or(base.background_enabled),
            timeout_seconds: override_config.timeout_seconds.or(base.timeout_seconds),
        }
    }
}

/// `[notifications]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Global switch for all notifications.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Notify when an item appears that was not in the previous batch.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_new_item: Option<bool>,

    /// Notify when an existing item's activity count increases.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_new_activity: Option<bool>,
}

impl NotificationConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn on_new_item(&self) -> bool {
        self.on_new_item.unwrap_or(true)
    }

    pub fn on_new_activity(&self) -> bool {
        self.on_new_activity.unwrap_or(true)
    }

    /// Merge two notification configs. Override takes precedence for set fields.
    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            enabled: override_config.enabled.or(base.enabled),
            on_new_item: override_config.on_new_item.or(base.on_new_item),
            on_new_activity: override_config.on_new_activity.or(base.on_new_activity),
        }
    }
}

/// `[prefetch]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Speculatively fetch item details after a short hover.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hover_enabled: Option<bool>,
}

impl PrefetchConfig {
    pub fn on_hover_enabled(&self) -> bool {
        self.on_hover_enabled.unwrap_or(true)
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            on_hover_enabled: override_config.on_hover_enabled.or(base.on_hover_enabled),
        }
    }
}

/// `[follow_up]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpConfig {
    /// Track followed items in the background on every automatic tick.
    /// Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl FollowUpConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            enabled: override_config.enabled.or(base.enabled),
        }
    }
}
