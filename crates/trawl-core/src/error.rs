use thiserror::Error;

/// Application-wide error types for Trawl.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No live or registered source with this id.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Resume was called on a source that is already running.
    #[error("Source is already active: {0}")]
    SourceAlreadyActive(String),

    /// A poll interval string did not parse as a positive duration.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// An extracted record is missing a field, carries an unparseable
    /// timestamp, or its extractor faulted.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the error came from fetching a page.
    ///
    /// Fetch failures are never surfaced to control-plane callers; the
    /// cycle or job that hit them simply yields no data.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true if the error is caused by the caller's input rather than
    /// by the system (unknown id, misuse, malformed interval).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AppError::SourceNotFound(_)
                | AppError::SourceAlreadyActive(_)
                | AppError::InvalidDuration(_)
        )
    }
}
