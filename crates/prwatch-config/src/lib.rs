//! # prwatch-config
//!
//! TOML configuration types, loading, and validation for prwatch.
//!
//! Single source of truth for `PrwatchConfig` and its sections.
//! Depends only on `prwatch-paths`.

mod loading;
mod validation;

pub mod errors;
pub mod types;

// Public API re-exports
pub use errors::ConfigError;
pub use loading::{load_config_file, load_hierarchy, merge_configs};
pub use types::{
    FollowUpConfig, NotificationConfig, PollingConfig, PrefetchConfig, PrwatchConfig,
};
pub use validation::{
    MAX_INTERVAL_SECONDS, MAX_TIMEOUT_SECONDS, MIN_INTERVAL_SECONDS, validate_config,
};

impl PrwatchConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, ConfigError> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    ///
    /// See [`validation::validate_config`] for details.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
