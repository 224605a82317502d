//! Job polling and cancellation.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use tscout_models::JobId;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Polling response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub kind: String,
    pub state: String,
    pub progress: u8,
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// GET /api/jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .jobs
        .get(&JobId::from(job_id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;

    if job.user_id != user.uid {
        return Err(ApiError::forbidden("job belongs to another user"));
    }

    Ok(Json(JobStatusResponse {
        job_id: job.id.to_string(),
        kind: job.kind.to_string(),
        state: job.state.to_string(),
        progress: job.progress,
        step: job.step,
        result_ref: job.result_ref,
        result: job.result,
        error: job.error,
        warnings: job.warnings,
    }))
}

/// DELETE /api/jobs/:job_id - request cooperative cancellation.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let id = JobId::from(job_id.clone());
    let job = state
        .jobs
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;

    if job.user_id != user.uid {
        return Err(ApiError::forbidden("job belongs to another user"));
    }
    if job.state.is_terminal() {
        return Err(ApiError::conflict("job is already terminal"));
    }

    state.jobs.request_cancel(&id).await?;
    Ok(Json(serde_json::json!({"status": "cancel_requested"})))
}
