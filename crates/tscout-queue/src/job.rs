//! Typed job payloads for the queue.
//!
//! Every payload carries the id of an already-persisted job document;
//! the API creates the record first and returns its id synchronously,
//! then enqueues the payload for a worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tscout_models::{ChannelId, JobId, JobKind, ProjectId};

/// Seed a project: resolve the channel, classify titles, discover
/// competitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectJob {
    pub job_id: JobId,
    pub user_id: String,
    /// Pre-generated project id, returned to the caller synchronously.
    pub project_id: ProjectId,
    pub name: String,
    pub seed_channel_url: String,
    pub created_at: DateTime<Utc>,
}

impl CreateProjectJob {
    pub fn new(
        job_id: JobId,
        user_id: impl Into<String>,
        project_id: ProjectId,
        name: impl Into<String>,
        seed_channel_url: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            user_id: user_id.into(),
            project_id,
            name: name.into(),
            seed_channel_url: seed_channel_url.into(),
            created_at: Utc::now(),
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("create_project:{}:{}", self.user_id, self.project_id)
    }
}

/// Add the selected candidates as competitors, then compute group metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeCompetitorsJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
    pub selected_channel_ids: Vec<ChannelId>,
}

impl FinalizeCompetitorsJob {
    pub fn idempotency_key(&self) -> String {
        let mut ids: Vec<&str> = self.selected_channel_ids.iter().map(|c| c.as_str()).collect();
        ids.sort_unstable();
        format!("finalize:{}:{}", self.project_id, ids.join(","))
    }
}

/// Recompute per-competitor and group metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeCompetitorsJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
}

impl AnalyzeCompetitorsJob {
    pub fn idempotency_key(&self) -> String {
        format!("analyze:{}:{}", self.project_id, self.job_id)
    }
}

/// Build the script breakdown and thumbnail guidelines for one theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResourcesJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
    pub series_name: String,
    pub theme_name: String,
}

impl PrepareResourcesJob {
    pub fn idempotency_key(&self) -> String {
        format!(
            "prepare:{}:{}:{}",
            self.project_id, self.series_name, self.theme_name
        )
    }
}

/// Standalone channel discovery with revenue estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverChannelsJob {
    pub job_id: JobId,
    pub user_id: String,
    pub query: String,
    pub limit: usize,
}

impl DiscoverChannelsJob {
    pub fn idempotency_key(&self) -> String {
        format!("discover:{}:{}", self.user_id, self.job_id)
    }
}

/// Generate a plot outline for a chosen title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlotJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
    pub series_name: String,
    pub theme_name: String,
    pub title: String,
    pub duration_min: u32,
}

impl GeneratePlotJob {
    pub fn idempotency_key(&self) -> String {
        format!("plot:{}:{}", self.project_id, self.job_id)
    }
}

/// Generate a full script. When `outline_index` is absent, a fresh
/// outline is generated first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateScriptJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
    pub series_name: String,
    pub theme_name: String,
    pub title: String,
    pub duration_min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_index: Option<usize>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// Sponsored-segment instructions, integrated after the hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsored: Option<String>,
}

impl GenerateScriptJob {
    pub fn idempotency_key(&self) -> String {
        format!("script:{}:{}", self.project_id, self.job_id)
    }
}

/// Render thumbnails from a trained model and concept strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateThumbnailsJob {
    pub job_id: JobId,
    pub user_id: String,
    pub project_id: ProjectId,
    pub series_name: String,
    pub theme_name: String,
    pub concepts: Vec<String>,
}

impl GenerateThumbnailsJob {
    pub fn idempotency_key(&self) -> String {
        format!("thumbnails:{}:{}", self.project_id, self.job_id)
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    CreateProject(CreateProjectJob),
    FinalizeCompetitors(FinalizeCompetitorsJob),
    AnalyzeCompetitors(AnalyzeCompetitorsJob),
    PrepareResources(PrepareResourcesJob),
    DiscoverChannels(DiscoverChannelsJob),
    GeneratePlot(GeneratePlotJob),
    GenerateScript(GenerateScriptJob),
    GenerateThumbnails(GenerateThumbnailsJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::CreateProject(j) => &j.job_id,
            QueueJob::FinalizeCompetitors(j) => &j.job_id,
            QueueJob::AnalyzeCompetitors(j) => &j.job_id,
            QueueJob::PrepareResources(j) => &j.job_id,
            QueueJob::DiscoverChannels(j) => &j.job_id,
            QueueJob::GeneratePlot(j) => &j.job_id,
            QueueJob::GenerateScript(j) => &j.job_id,
            QueueJob::GenerateThumbnails(j) => &j.job_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            QueueJob::CreateProject(j) => &j.user_id,
            QueueJob::FinalizeCompetitors(j) => &j.user_id,
            QueueJob::AnalyzeCompetitors(j) => &j.user_id,
            QueueJob::PrepareResources(j) => &j.user_id,
            QueueJob::DiscoverChannels(j) => &j.user_id,
            QueueJob::GeneratePlot(j) => &j.user_id,
            QueueJob::GenerateScript(j) => &j.user_id,
            QueueJob::GenerateThumbnails(j) => &j.user_id,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            QueueJob::CreateProject(_) => JobKind::CreateProject,
            QueueJob::FinalizeCompetitors(_) => JobKind::FinalizeCompetitors,
            QueueJob::AnalyzeCompetitors(_) => JobKind::AnalyzeCompetitors,
            QueueJob::PrepareResources(_) => JobKind::PrepareResources,
            QueueJob::DiscoverChannels(_) => JobKind::DiscoverChannels,
            QueueJob::GeneratePlot(_) => JobKind::GeneratePlot,
            QueueJob::GenerateScript(_) => JobKind::GenerateScript,
            QueueJob::GenerateThumbnails(_) => JobKind::GenerateThumbnails,
        }
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            QueueJob::CreateProject(j) => Some(&j.project_id),
            QueueJob::FinalizeCompetitors(j) => Some(&j.project_id),
            QueueJob::AnalyzeCompetitors(j) => Some(&j.project_id),
            QueueJob::PrepareResources(j) => Some(&j.project_id),
            QueueJob::DiscoverChannels(_) => None,
            QueueJob::GeneratePlot(j) => Some(&j.project_id),
            QueueJob::GenerateScript(j) => Some(&j.project_id),
            QueueJob::GenerateThumbnails(j) => Some(&j.project_id),
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::CreateProject(j) => j.idempotency_key(),
            QueueJob::FinalizeCompetitors(j) => j.idempotency_key(),
            QueueJob::AnalyzeCompetitors(j) => j.idempotency_key(),
            QueueJob::PrepareResources(j) => j.idempotency_key(),
            QueueJob::DiscoverChannels(j) => j.idempotency_key(),
            QueueJob::GeneratePlot(j) => j.idempotency_key(),
            QueueJob::GenerateScript(j) => j.idempotency_key(),
            QueueJob::GenerateThumbnails(j) => j.idempotency_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_job_serde_round_trip() {
        let job = GenerateScriptJob {
            job_id: JobId::new(),
            user_id: "user-1".to_string(),
            project_id: ProjectId::from("p1"),
            series_name: "X But Y".to_string(),
            theme_name: "Sleep".to_string(),
            title: "The Fall of Carthage".to_string(),
            duration_min: 60,
            outline_index: Some(0),
            characters: vec!["NARRATOR".to_string()],
            host_name: Some("Marcus".to_string()),
            sponsored: None,
        };

        let wrapper = QueueJob::GenerateScript(job.clone());
        let json = serde_json::to_string(&wrapper).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"generate_script\""));

        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        match decoded {
            QueueJob::GenerateScript(j) => {
                assert_eq!(j.job_id, job.job_id);
                assert_eq!(j.title, job.title);
                assert_eq!(j.outline_index, Some(0));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn finalize_key_is_order_insensitive() {
        let a = FinalizeCompetitorsJob {
            job_id: JobId::new(),
            user_id: "u".to_string(),
            project_id: ProjectId::from("p1"),
            selected_channel_ids: vec![ChannelId::from("UCb"), ChannelId::from("UCa")],
        };
        let b = FinalizeCompetitorsJob {
            job_id: JobId::new(),
            user_id: "u".to_string(),
            project_id: ProjectId::from("p1"),
            selected_channel_ids: vec![ChannelId::from("UCa"), ChannelId::from("UCb")],
        };
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }

    #[test]
    fn kind_mapping() {
        let job = QueueJob::AnalyzeCompetitors(AnalyzeCompetitorsJob {
            job_id: JobId::new(),
            user_id: "u".to_string(),
            project_id: ProjectId::from("p1"),
        });
        assert_eq!(job.kind(), JobKind::AnalyzeCompetitors);
        assert!(job.project_id().is_some());
    }
}
