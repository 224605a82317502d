//! Script pipeline error types.

use thiserror::Error;

use tscout_models::OutlineValidationError;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("outline rejected: {0}")]
    OutlineInvalid(#[from] OutlineValidationError),

    #[error("could not parse model output: {0}")]
    Parse(String),

    #[error("LLM error: {0}")]
    Llm(#[from] tscout_llm::LlmError),
}

impl ScriptError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
