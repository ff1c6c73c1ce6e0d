use std::error::Error;

/// Base trait for all application errors
pub trait PrwatchError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Common result type for the application
pub type PrwatchResult<T> = Result<T, Box<dyn PrwatchError>>;

impl PrwatchError for prwatch_config::ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            prwatch_config::ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            prwatch_config::ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            prwatch_config::ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            prwatch_config::ConfigError::ConfigParseError { .. }
                | prwatch_config::ConfigError::InvalidConfiguration { .. }
        )
    }
}

impl PrwatchError for prwatch_paths::PathError {
    fn error_code(&self) -> &'static str {
        match self {
            prwatch_paths::PathError::HomeNotFound => "HOME_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
