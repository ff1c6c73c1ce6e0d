use crate::errors::PrwatchError;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid key '{key}': {message}")]
    InvalidKey { key: String, message: String },
}

impl PrwatchError for PersistenceError {
    fn error_code(&self) -> &'static str {
        match self {
            PersistenceError::IoError { .. } => "PERSISTENCE_IO_ERROR",
            PersistenceError::SerializationError { .. } => "PERSISTENCE_SERIALIZATION_ERROR",
            PersistenceError::InvalidKey { .. } => "PERSISTENCE_INVALID_KEY",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, PersistenceError::InvalidKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let error: PersistenceError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(error.error_code(), "PERSISTENCE_IO_ERROR");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_serialization_error_from() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: PersistenceError = source.into();
        assert_eq!(error.error_code(), "PERSISTENCE_SERIALIZATION_ERROR");
    }

    #[test]
    fn test_invalid_key() {
        let error = PersistenceError::InvalidKey {
            key: String::new(),
            message: "key cannot be empty".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid key '': key cannot be empty");
        assert!(error.is_user_error());
    }
}
