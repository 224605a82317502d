//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing secret: {0}")]
    MissingSecret(String),

    #[error("store error: {0}")]
    Firestore(#[from] tscout_firestore::FirestoreError),

    #[error("queue error: {0}")]
    Queue(#[from] tscout_queue::QueueError),

    #[error("search error: {0}")]
    Youtube(#[from] tscout_youtube::YoutubeError),

    #[error("LLM error: {0}")]
    Llm(#[from] tscout_llm::LlmError),

    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] tscout_taxonomy::TaxonomyError),

    #[error("discovery error: {0}")]
    Discovery(#[from] tscout_discovery::DiscoveryError),

    #[error("script error: {0}")]
    Script(#[from] tscout_script::ScriptError),

    #[error("thumbnail error: {0}")]
    Thumbnail(#[from] tscout_thumbnail::ThumbnailError),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn missing_secret(service: impl Into<String>) -> Self {
        Self::MissingSecret(service.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled(_))
    }
}
