use thiserror::Error;

use crate::models::FetchErrorKind;

/// Application-wide error types for Gleaner.
///
/// Per-URL failures inside a batch never surface as `AppError`; they are
/// recorded in the batch output instead. `AppError` covers precondition
/// violations, configuration problems and the structured-extraction path.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-supplied input was rejected before any work started.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client could not be built or a request could not be issued.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// A page fetch ended in a typed failure.
    #[error("Fetch failed ({kind}): {message}")]
    FetchFailed {
        kind: FetchErrorKind,
        message: String,
    },

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// HTML-to-Markdown conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// LLM output does not match the expected shape.
    #[error("Schema validation error: {0}")]
    SchemaValidationError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Reading or writing CSV failed.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient.
    ///
    /// Nothing in Gleaner retries on its own; callers use this to decide
    /// whether resubmitting a request is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::LlmError { retryable, .. } => *retryable,
            AppError::FetchFailed { kind, .. } => {
                matches!(kind, FetchErrorKind::Connection | FetchErrorKind::Timeout)
            }
            _ => false,
        }
    }
}

/// The content extractor could not produce a record from a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExtractionError(pub String);

impl ExtractionError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }

    pub fn cause(&self) -> &str {
        &self.0
    }
}
