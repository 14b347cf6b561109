//! Typed errors for the recipe extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each pipeline stage has its own
//! error type; the orchestrator maps them onto caller-facing [`ErrorCode`]s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the content acquisition collaborators.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transient failure; the caller may retry later
    #[error("retryable fetch failure for {url}: {message}")]
    Retryable { url: String, message: String },

    /// Permanent failure for this URL
    #[error("fetch failed for {url}: {message}")]
    Fatal { url: String, message: String },

    /// Collaborator produced nothing usable
    #[error("no recipe content found at {url}")]
    Empty { url: String },

    /// Stage timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

impl FetchError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. } | Self::Timeout { .. })
    }

    /// Classify an HTTP status from the acquisition service.
    pub fn from_status(url: &str, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 429 || status >= 500 {
            Self::Retryable {
                url: url.to_string(),
                message: format!("HTTP {}: {}", status, message),
            }
        } else {
            Self::Fatal {
                url: url.to_string(),
                message: format!("HTTP {}: {}", status, message),
            }
        }
    }
}

/// Errors from a single generation provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Provider returned empty output")]
    EmptyResponse,

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider timed out after {0} seconds")]
    Timeout(u64),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether this failure signals temporary unavailability of the provider.
    pub fn is_temporary(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status onto a provider error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited {
                retry_after_secs: None,
            },
            502..=504 | 529 => Self::Unavailable(format!("HTTP {}: {}", status, message)),
            _ => Self::ApiError { status, message },
        }
    }
}

/// Terminal error of the fallback orchestrator.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Primary failed and no secondary provider is registered
    #[error("provider {provider} failed: {source}")]
    ProviderFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Primary and secondary both failed
    #[error("all providers failed (primary {primary}: {primary_error}; secondary {secondary}: {secondary_error})")]
    AllProvidersFailed {
        primary: String,
        primary_error: ProviderError,
        secondary: String,
        secondary_error: ProviderError,
    },
}

/// Provider output could not be parsed into a recipe.
///
/// Carries the raw text so the failure can be diagnosed from logs.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NormalizeError {
    pub message: String,
    pub raw: String,
}

impl NormalizeError {
    pub fn new(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

/// Cache store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store timed out")]
    Timeout,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Embedding service failures.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("embedding service returned no vector")]
    Empty,

    #[error("embedding timed out")]
    Timeout,
}

/// Caller-facing error classification carried in a `ParseOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    FetchFailed,
    GenerationFailed,
    GenerationEmpty,
    FinalValidationFailed,
    AmbiguousMatch,
}

impl ErrorCode {
    /// The caller can fix the request and try again.
    pub fn is_client_correctable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::GenerationEmpty
                | Self::FinalValidationFailed
                | Self::AmbiguousMatch
        )
    }

    /// Failure depends on an upstream service; retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::GenerationFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::FetchFailed => "FETCH_FAILED",
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::GenerationEmpty => "GENERATION_EMPTY",
            Self::FinalValidationFailed => "FINAL_VALIDATION_FAILED",
            Self::AmbiguousMatch => "AMBIGUOUS_MATCH",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for acquisition operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
