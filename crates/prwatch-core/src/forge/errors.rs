use crate::errors::PrwatchError;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("Forge CLI '{cli}' not found or not executable")]
    CliNotFound { cli: String },

    #[error("Forge CLI error: {message}")]
    CliError { message: String },

    #[error("Failed to parse forge response: {message}")]
    ParseError { message: String },

    #[error("Invalid selector: {message}")]
    InvalidSelector { message: String },

    #[error("IO error during forge operation: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl PrwatchError for ForgeError {
    fn error_code(&self) -> &'static str {
        match self {
            ForgeError::CliNotFound { .. } => "FORGE_CLI_NOT_FOUND",
            ForgeError::CliError { .. } => "FORGE_CLI_ERROR",
            ForgeError::ParseError { .. } => "FORGE_PARSE_ERROR",
            ForgeError::InvalidSelector { .. } => "FORGE_INVALID_SELECTOR",
            ForgeError::IoError { .. } => "FORGE_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ForgeError::CliNotFound { .. } | ForgeError::InvalidSelector { .. }
        )
    }
}
