//! LLM client error types.

use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The model refused to answer. Never retried.
    #[error("model refused the request: {0}")]
    Refusal(String),

    /// Structured output could not be parsed after local repair and a
    /// full retry. Carries the raw payload for diagnosis.
    #[error("failed to parse structured output: {message}")]
    Parse { message: String, raw: String },

    /// Transient upstream failure after retries were exhausted.
    #[error("upstream transient failure: {0}")]
    Transient(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::Transient(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
