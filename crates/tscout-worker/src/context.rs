//! Worker dependencies and per-job user context.

use std::sync::Arc;

use tscout_firestore::{
    FirestoreClient, JobRepository, ProjectLocks, ProjectRepository, SecretsRepository,
};
use tscout_llm::{LlmClient, LlmConfig};
use tscout_queue::JobQueue;
use tscout_thumbnail::{ImageModelClient, ImageModelConfig};
use tscout_youtube::{KeyPool, YoutubeClient, YoutubeConfig};

use tscout_models::{secrets::services, SecretsSnapshot};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Shared, process-wide worker dependencies.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub projects: ProjectRepository,
    pub jobs: JobRepository,
    pub secrets: SecretsRepository,
    pub locks: ProjectLocks,
    pub queue: Arc<JobQueue>,
}

impl WorkerContext {
    /// Build the context from environment configuration.
    pub async fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let firestore = FirestoreClient::from_env().await?;
        let queue = JobQueue::from_env()?;

        Ok(Self {
            config,
            projects: ProjectRepository::new(firestore.clone()),
            jobs: JobRepository::new(firestore.clone()),
            secrets: SecretsRepository::new(firestore),
            locks: ProjectLocks::new(),
            queue: Arc::new(queue),
        })
    }

    /// Snapshot a user's secrets into a job-scoped context. Clients built
    /// from it read keys only from the snapshot, with environment
    /// defaults as fallback.
    pub async fn user_context(&self, user_id: &str) -> WorkerResult<UserContext> {
        let snapshot = self.secrets.snapshot_for_user(user_id).await?;
        Ok(UserContext {
            user_id: user_id.to_string(),
            secrets: snapshot,
        })
    }
}

/// Read-only per-job user context.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub secrets: SecretsSnapshot,
}

impl UserContext {
    /// LLM client bound to this user's key (env default: `LLM_API_KEY`).
    pub fn llm(&self) -> WorkerResult<LlmClient> {
        let api_key = self
            .secrets
            .get_or_env(services::ANTHROPIC, "LLM_API_KEY")
            .ok_or_else(|| WorkerError::missing_secret(services::ANTHROPIC))?;
        let mut config = LlmConfig::new(api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        Ok(LlmClient::new(config)?)
    }

    /// Search client bound to this user's key pool (env default:
    /// `SEARCH_API_KEYS`).
    pub fn youtube(&self) -> WorkerResult<YoutubeClient> {
        let keys = match self.secrets.get(services::YOUTUBE) {
            Some(key) => KeyPool::from_csv(key),
            None => KeyPool::from_csv(&std::env::var("SEARCH_API_KEYS").unwrap_or_default()),
        };
        if keys.is_empty() {
            return Err(WorkerError::missing_secret(services::YOUTUBE));
        }
        Ok(YoutubeClient::new(YoutubeConfig::new(
            keys.iter_from_current().map(String::from).collect(),
        ))?)
    }

    /// Image model client (env default: `IMAGE_MODEL_API_KEY`).
    pub fn image_model(&self) -> WorkerResult<ImageModelClient> {
        let api_key = self
            .secrets
            .get_or_env(services::REPLICATE, "IMAGE_MODEL_API_KEY")
            .ok_or_else(|| WorkerError::missing_secret(services::REPLICATE))?;
        Ok(ImageModelClient::new(ImageModelConfig::new(api_key))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn clients_require_their_secret() {
        let context = UserContext {
            user_id: "u1".to_string(),
            secrets: SecretsSnapshot::default(),
        };
        // No snapshot key and (in tests) no env default.
        std::env::remove_var("LLM_API_KEY");
        assert!(matches!(
            context.llm(),
            Err(WorkerError::MissingSecret(_))
        ));
    }

    #[test]
    fn snapshot_key_wins_over_env() {
        let mut keys = HashMap::new();
        keys.insert(services::ANTHROPIC.to_string(), "sk-user".to_string());
        let context = UserContext {
            user_id: "u1".to_string(),
            secrets: SecretsSnapshot::new(keys),
        };
        assert!(context.llm().is_ok());
    }
}
