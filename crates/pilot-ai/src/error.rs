//! Error types for pilot-ai

use thiserror::Error;

/// Result type alias using pilot-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a remote provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and its body to an error
    pub fn from_status(status: reqwest::StatusCode, retry_after: Option<u64>, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => Error::InvalidApiKey,
            429 => Error::RateLimited { retry_after },
            _ => Error::api(format!("http_{}", status.as_u16()), body),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::RateLimited { .. } | Error::Timeout => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                // 5xx and overload patterns
                et.starts_with("http_5")
                    || et.contains("overloaded")
                    || msg.contains("overloaded")
                    || msg.contains("too many requests")
                    || msg.contains("service unavailable")
            }
            _ => false,
        }
    }
}
