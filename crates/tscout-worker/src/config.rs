//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs per worker process
    pub max_concurrent_jobs: usize,
    /// How many seed videos to pull when creating a project
    pub seed_video_limit: usize,
    /// How many recent videos to pull per competitor
    pub competitor_video_limit: usize,
    /// How often to scan for jobs abandoned by crashed workers
    pub claim_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Base image-model version used for fine-tune training; training is
    /// skipped when unset
    pub image_model_base_version: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            seed_video_limit: 500,
            competitor_video_limit: 50,
            claim_interval: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
            image_model_base_version: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            seed_video_limit: std::env::var("WORKER_SEED_VIDEO_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.seed_video_limit),
            competitor_video_limit: std::env::var("WORKER_COMPETITOR_VIDEO_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.competitor_video_limit),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.claim_interval.as_secs()),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.shutdown_timeout.as_secs()),
            ),
            image_model_base_version: std::env::var("IMAGE_MODEL_BASE_VERSION").ok(),
        }
    }
}
