//! Request handlers.

pub mod health;
pub mod jobs;
pub mod projects;
pub mod secrets;

use tscout_models::{Job, JobKind, ProjectId};
use tscout_queue::QueueJob;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create the job record, then enqueue its payload. The record comes
/// first so the returned id is immediately pollable.
pub(crate) async fn create_and_enqueue(
    state: &AppState,
    kind: JobKind,
    user_id: &str,
    project_id: Option<ProjectId>,
    build_payload: impl FnOnce(&Job) -> QueueJob,
) -> ApiResult<Job> {
    let job = Job::new(kind, user_id, project_id);
    state.jobs.create(&job).await?;

    let payload = build_payload(&job);
    match state.queue.enqueue(payload).await {
        Ok(_) => Ok(job),
        Err(tscout_queue::QueueError::EnqueueFailed(_)) => {
            // Duplicate work already in flight; drop the orphan record.
            let orphan = job.fail("duplicate of an in-flight job");
            state.jobs.put(&orphan).await.ok();
            Err(ApiError::conflict("an identical job is already running"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Load a project the caller may read.
pub(crate) async fn load_visible_project(
    state: &AppState,
    project_id: &ProjectId,
    user_id: &str,
) -> ApiResult<tscout_models::Project> {
    let project = state
        .projects
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("project {project_id}")))?;

    if !project.is_visible_to(user_id) {
        return Err(ApiError::forbidden("project belongs to another user"));
    }
    Ok(project)
}
