//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("authentication failed: {0}")]
    AuthError(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FirestoreError::Network(_) | FirestoreError::RateLimited(_)
        )
    }

    /// Suggested delay from a 429 response, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FirestoreError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }
}
