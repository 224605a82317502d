//! Thumbnail pipeline error types.

use thiserror::Error;

pub type ThumbnailResult<T> = Result<T, ThumbnailError>;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("image model returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("training failed: {0}")]
    Training(String),

    #[error("prediction timed out after {0}s")]
    Timeout(u64),

    #[error("LLM error: {0}")]
    Llm(#[from] tscout_llm::LlmError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ThumbnailError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
