//! Configuration validation logic.

use crate::errors::ConfigError;
use crate::types::PrwatchConfig;

pub const MIN_INTERVAL_SECONDS: u64 = 10;
pub const MAX_INTERVAL_SECONDS: u64 = 3600;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Validate a PrwatchConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - `polling.interval_seconds` must lie in `[10, 3600]`
/// - `polling.timeout_seconds` must lie in `[1, 300]`
/// - the timeout must be shorter than the interval
pub fn validate_config(config: &PrwatchConfig) -> Result<(), ConfigError> {
    let interval = config.polling.interval_seconds();
    if !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&interval) {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "polling.interval_seconds must be between {} and {}, got {}",
                MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS, interval
            ),
        });
    }

    let timeout = config.polling.timeout_seconds();
    if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "polling.timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, timeout
            ),
        });
    }

    if timeout >= interval {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "polling.timeout_seconds ({}) must be shorter than polling.interval_seconds ({})",
                timeout, interval
            ),
        });
    }

    Ok(())
}
