//! Discovery error types.

use thiserror::Error;

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("search error: {0}")]
    Youtube(#[from] tscout_youtube::YoutubeError),

    #[error("LLM error: {0}")]
    Llm(#[from] tscout_llm::LlmError),
}

impl DiscoveryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
