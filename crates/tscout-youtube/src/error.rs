//! Search client error types.

use thiserror::Error;

pub type YoutubeResult<T> = Result<T, YoutubeError>;

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Every key in the pool is out of quota for this operation.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("invalid channel URL: {0}")]
    InvalidUrl(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl YoutubeError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn quota(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, YoutubeError::QuotaExceeded(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            YoutubeError::Network(_) | YoutubeError::Transient(_) => true,
            YoutubeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
