//! Extractor error types.

use thiserror::Error;

pub type TaxonomyResult<T> = Result<T, TaxonomyError>;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] tscout_llm::LlmError),
}

impl TaxonomyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
