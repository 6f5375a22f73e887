use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while chunking a document.
///
/// Malformed text never produces an error: the engine degrades to empty output or
/// default classifications. Errors are reserved for invalid configuration and for
/// inputs above the configured size limit.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sanitized document exceeds the configured size limit
    #[error("Input too large: {chars} chars exceeds limit of {limit}")]
    InputTooLarge { chars: usize, limit: usize },
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
