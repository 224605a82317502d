//! Job progress tracking with checkpoint cancellation.

use tracing::{info, warn};

use tscout_firestore::{JobRepository, ProjectRepository};
use tscout_models::{Job, JobState};

use crate::error::{WorkerError, WorkerResult};

/// Tracks one running job's document.
///
/// Every checkpoint re-reads the job document. A job whose document was
/// deleted or flagged `cancel_requested`, or whose project has vanished,
/// fails with `Cancelled` at that checkpoint; in-flight work before the
/// checkpoint is simply discarded.
pub struct JobTracker {
    jobs: JobRepository,
    projects: ProjectRepository,
    job: Job,
    /// Whether checkpoints verify the project still exists. Off until
    /// the create-project pipeline has written the project record.
    require_project: bool,
}

impl JobTracker {
    pub fn new(jobs: JobRepository, projects: ProjectRepository, job: Job) -> Self {
        Self {
            jobs,
            projects,
            job,
            require_project: true,
        }
    }

    /// Disable the project-existence check until the project is created.
    pub fn without_project_check(mut self) -> Self {
        self.require_project = false;
        self
    }

    /// Re-enable the project-existence check.
    pub fn expect_project(&mut self) {
        self.require_project = true;
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Record a progress checkpoint, honoring cancellation.
    pub async fn checkpoint(&mut self, progress: u8, step: impl Into<String>) -> WorkerResult<()> {
        let step = step.into();
        self.assert_alive().await?;

        self.job = self.job.clone().with_progress(progress, step.clone());
        self.jobs.put(&self.job).await?;
        info!(job = %self.job.id, progress, step, "job checkpoint");
        Ok(())
    }

    /// Record a non-fatal warning on the job document.
    pub async fn warn(&mut self, message: impl Into<String>) -> WorkerResult<()> {
        let message = message.into();
        warn!(job = %self.job.id, "{message}");
        self.job.warnings.push(message);
        self.jobs.put(&self.job).await?;
        Ok(())
    }

    /// Mark the job complete.
    pub async fn complete(mut self, result_ref: impl Into<String>) -> WorkerResult<()> {
        self.job = self.job.clone().complete(result_ref);
        self.jobs.put(&self.job).await?;
        info!(job = %self.job.id, "job complete");
        Ok(())
    }

    /// Mark the job complete with an inline result document.
    pub async fn complete_with_result(
        mut self,
        result_ref: impl Into<String>,
        result: serde_json::Value,
    ) -> WorkerResult<()> {
        self.job.result = Some(result);
        self.job = self.job.clone().complete(result_ref);
        self.jobs.put(&self.job).await?;
        info!(job = %self.job.id, "job complete");
        Ok(())
    }

    /// Mark the job failed.
    pub async fn fail(mut self, error: impl Into<String>) -> WorkerResult<()> {
        let error = error.into();
        self.job = self.job.clone().fail(error.clone());
        self.jobs.put(&self.job).await?;
        warn!(job = %self.job.id, "job failed: {error}");
        Ok(())
    }

    async fn assert_alive(&self) -> WorkerResult<()> {
        let current = self
            .jobs
            .get(&self.job.id)
            .await?
            .ok_or_else(|| WorkerError::cancelled("job document deleted"))?;

        if current.cancel_requested {
            return Err(WorkerError::cancelled("cancel requested"));
        }
        if current.state != JobState::Running {
            return Err(WorkerError::cancelled(format!(
                "job already terminal ({})",
                current.state
            )));
        }

        if self.require_project {
            if let Some(project_id) = &self.job.project_id {
                if self.projects.get(project_id).await?.is_none() {
                    return Err(WorkerError::cancelled("project deleted"));
                }
            }
        }

        Ok(())
    }
}
