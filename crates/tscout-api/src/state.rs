//! Application state.

use std::sync::Arc;

use tscout_firestore::{
    FirestoreClient, JobRepository, ProjectLocks, ProjectRepository, SecretsRepository,
};
use tscout_queue::JobQueue;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub projects: ProjectRepository,
    pub jobs: JobRepository,
    pub secrets: SecretsRepository,
    pub locks: ProjectLocks,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
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
}
