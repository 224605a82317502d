//! Background job document.
//!
//! A job is created in `running` state before its worker starts, is updated
//! by exactly one worker, and is terminal once `complete` or `error`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{JobId, ProjectId};

/// The kind of pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Seed a project: taxonomy extraction + initial competitor discovery
    CreateProject,
    /// Add the selected candidates as competitors and compute group metrics
    FinalizeCompetitors,
    /// Recompute per-competitor and group metrics
    AnalyzeCompetitors,
    /// Build the script breakdown and thumbnail guidelines for a theme
    PrepareResources,
    /// Standalone channel discovery with revenue estimates
    DiscoverChannels,
    /// Generate a plot outline for a chosen title
    GeneratePlot,
    /// Generate a full script from an outline
    GenerateScript,
    /// Render thumbnails from a trained model and concepts
    GenerateThumbnails,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::CreateProject => "create_project",
            JobKind::FinalizeCompetitors => "finalize_competitors",
            JobKind::AnalyzeCompetitors => "analyze_competitors",
            JobKind::PrepareResources => "prepare_resources",
            JobKind::DiscoverChannels => "discover_channels",
            JobKind::GeneratePlot => "generate_plot",
            JobKind::GenerateScript => "generate_script",
            JobKind::GenerateThumbnails => "generate_thumbnails",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Running,
    Complete,
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Complete => "complete",
            JobState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A background job record, persisted in the `jobs` collection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub state: JobState,
    /// Progress percentage, 0..=100
    #[serde(default)]
    pub progress: u8,
    /// Human-readable step label
    #[serde(default)]
    pub step: String,
    /// Pointer into the owning project's sub-documents on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    /// Inline result document for jobs that own no project (e.g.
    /// standalone channel discovery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal problems (segment placeholders and the like); the job
    /// still completes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Set by the API to request cooperative cancellation; the worker
    /// honors it at the next checkpoint.
    #[serde(default)]
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job in `Running` state.
    pub fn new(kind: JobKind, user_id: impl Into<String>, project_id: Option<ProjectId>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            user_id: user_id.into(),
            project_id,
            state: JobState::Running,
            progress: 0,
            step: "queued".to_string(),
            result_ref: None,
            result: None,
            error: None,
            warnings: Vec::new(),
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a progress checkpoint. No-op once terminal.
    pub fn with_progress(mut self, progress: u8, step: impl Into<String>) -> Self {
        if self.state == JobState::Running {
            self.progress = progress.min(100);
            self.step = step.into();
            self.updated_at = Utc::now();
        }
        self
    }

    /// Mark complete with a result reference. No-op once terminal.
    pub fn complete(mut self, result_ref: impl Into<String>) -> Self {
        if self.state == JobState::Running {
            self.state = JobState::Complete;
            self.progress = 100;
            self.step = "done".to_string();
            self.result_ref = Some(result_ref.into());
            self.updated_at = Utc::now();
        }
        self
    }

    /// Mark failed with an error message. No-op once terminal.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        if self.state == JobState::Running {
            self.state = JobState::Error;
            self.error = Some(error.into());
            self.updated_at = Utc::now();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_lifecycle() {
        let job = Job::new(JobKind::CreateProject, "user-1", None);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.progress, 0);

        let job = job.with_progress(40, "classifying titles");
        assert_eq!(job.progress, 40);
        assert_eq!(job.step, "classifying titles");

        let job = job.complete("projects/p1/taxonomy");
        assert_eq!(job.state, JobState::Complete);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result_ref.as_deref(), Some("projects/p1/taxonomy"));
    }

    #[test]
    fn terminal_states_are_sticky() {
        let job = Job::new(JobKind::GenerateScript, "user-1", None).fail("boom");
        assert_eq!(job.state, JobState::Error);

        // Later transitions must not resurrect a terminal job.
        let job = job.with_progress(10, "nope").complete("nope");
        assert_eq!(job.state, JobState::Error);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result_ref.is_none());
    }

    #[test]
    fn progress_is_clamped() {
        let job = Job::new(JobKind::GeneratePlot, "u", None).with_progress(250, "step");
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobKind::FinalizeCompetitors).unwrap(),
            "\"finalize_competitors\""
        );
    }
}
