//! Per-kind job pipelines.

pub mod analyze;
pub mod create_project;
pub mod discover;
pub mod finalize;
pub mod generate_plot;
pub mod generate_script;
pub mod generate_thumbnails;
pub mod prepare_resources;

use tscout_models::{Project, ProjectId};
use tscout_queue::QueueJob;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::progress::JobTracker;

/// Run the pipeline matching the queue payload.
pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    tracker: JobTracker,
    job: QueueJob,
) -> WorkerResult<()> {
    match job {
        QueueJob::CreateProject(job) => create_project::run(ctx, user, tracker, job).await,
        QueueJob::FinalizeCompetitors(job) => finalize::run(ctx, user, tracker, job).await,
        QueueJob::AnalyzeCompetitors(job) => analyze::run(ctx, user, tracker, job).await,
        QueueJob::PrepareResources(job) => prepare_resources::run(ctx, user, tracker, job).await,
        QueueJob::DiscoverChannels(job) => discover::run(ctx, user, tracker, job).await,
        QueueJob::GeneratePlot(job) => generate_plot::run(ctx, user, tracker, job).await,
        QueueJob::GenerateScript(job) => generate_script::run(ctx, user, tracker, job).await,
        QueueJob::GenerateThumbnails(job) => generate_thumbnails::run(ctx, user, tracker, job).await,
    }
}

/// Load a project or fail the job.
pub(crate) async fn load_project(
    ctx: &WorkerContext,
    project_id: &ProjectId,
) -> WorkerResult<Project> {
    ctx.projects
        .get(project_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("project {project_id} not found")))
}

/// Read-modify-write a project under its write lock.
pub(crate) async fn update_project<F>(
    ctx: &WorkerContext,
    project_id: &ProjectId,
    mutate: F,
) -> WorkerResult<Project>
where
    F: FnOnce(&mut Project),
{
    let _guard = ctx.locks.lock(project_id).await;
    let mut project = load_project(ctx, project_id).await?;
    mutate(&mut project);
    project.touch();
    ctx.projects.put(&project).await?;
    Ok(project)
}
