//! Project handlers: creation, inspection, competitor selection and
//! content generation triggers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use tscout_discovery::{theme_outliers, ThemeOutlier};
use tscout_models::{resource_key, ChannelId, JobKind, Project, ProjectId, ResourceStatus};
use tscout_queue::{
    AnalyzeCompetitorsJob, CreateProjectJob, DiscoverChannelsJob, FinalizeCompetitorsJob,
    GeneratePlotJob, GenerateScriptJob, GenerateThumbnailsJob, PrepareResourcesJob, QueueJob,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{create_and_enqueue, load_visible_project};
use crate::state::AppState;

fn validate_body<T: Validate>(body: &T) -> ApiResult<()> {
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))
}

// ============================================================================
// Listing and inspection
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    pub status: String,
    pub seed_channel_title: String,
    pub series_count: usize,
    pub competitors_count: usize,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            project_id: project.id.to_string(),
            name: project.name.clone(),
            status: project.status.to_string(),
            seed_channel_title: project.seed_channel.title.clone(),
            series_count: project.taxonomy.series.len(),
            competitors_count: project.competitors.len(),
        }
    }
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = state.projects.list_for_user(&user.uid).await?;
    Ok(Json(projects.iter().map(ProjectSummary::from).collect()))
}

/// GET /api/projects/:project_id
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<Project>> {
    let project = load_visible_project(&state, &ProjectId::from(project_id), &user.uid).await?;
    Ok(Json(project))
}

/// GET /api/projects/:project_id/potential_competitors
pub async fn get_potential_competitors(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let project = load_visible_project(&state, &ProjectId::from(project_id), &user.uid).await?;
    Ok(Json(serde_json::json!({
        "potential_competitors": project.potential_competitors,
    })))
}

/// GET /api/projects/:project_id/outliers
pub async fn get_outliers(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ThemeOutlier>>> {
    let project = load_visible_project(&state, &ProjectId::from(project_id), &user.uid).await?;
    Ok(Json(theme_outliers(&project.taxonomy)))
}

/// DELETE /api/projects/:project_id
///
/// Deletes the project and everything nested on it. Jobs referencing it
/// fail with `cancelled` at their next checkpoint.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let id = ProjectId::from(project_id);
    let project = load_visible_project(&state, &id, &user.uid).await?;
    if project.owner_id != user.uid {
        return Err(ApiError::forbidden("only the owner can delete a project"));
    }

    state.projects.delete(&id).await?;
    state.locks.forget(&id).await;
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

// ============================================================================
// Job triggers
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 10, max = 2048))]
    pub seed_channel_url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project_id: String,
    pub job_id: String,
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<Json<CreateProjectResponse>> {
    validate_body(&body)?;

    let project_id = ProjectId::new();
    let job = create_and_enqueue(
        &state,
        JobKind::CreateProject,
        &user.uid,
        Some(project_id.clone()),
        |job| {
            QueueJob::CreateProject(CreateProjectJob::new(
                job.id.clone(),
                &user.uid,
                project_id.clone(),
                &body.name,
                &body.seed_channel_url,
            ))
        },
    )
    .await?;

    Ok(Json(CreateProjectResponse {
        project_id: job
            .project_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
        job_id: job.id.to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinalizeRequest {
    #[validate(length(min = 1, max = 50))]
    pub selected_channel_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: String,
}

/// POST /api/projects/:project_id/finalize
pub async fn finalize_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
    Json(body): Json<FinalizeRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(
        &state,
        JobKind::FinalizeCompetitors,
        &user.uid,
        Some(id.clone()),
        |job| {
            QueueJob::FinalizeCompetitors(FinalizeCompetitorsJob {
                job_id: job.id.clone(),
                user_id: user.uid.clone(),
                project_id: id.clone(),
                selected_channel_ids: body
                    .selected_channel_ids
                    .iter()
                    .map(|s| ChannelId::from(s.as_str()))
                    .collect(),
            })
        },
    )
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

/// POST /api/projects/:project_id/analyze
pub async fn analyze_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<JobAccepted>> {
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(
        &state,
        JobKind::AnalyzeCompetitors,
        &user.uid,
        Some(id.clone()),
        |job| {
            QueueJob::AnalyzeCompetitors(AnalyzeCompetitorsJob {
                job_id: job.id.clone(),
                user_id: user.uid.clone(),
                project_id: id.clone(),
            })
        },
    )
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

// ============================================================================
// Content resources
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub series: String,
    pub theme: String,
}

/// GET /api/projects/:project_id/resources?series=&theme=
pub async fn check_resources(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ResourceQuery>,
    user: AuthUser,
) -> ApiResult<Json<ResourceStatus>> {
    let project = load_visible_project(&state, &ProjectId::from(project_id), &user.uid).await?;
    let status = project
        .content_resources
        .get(&resource_key(&query.series, &query.theme))
        .map(|resources| resources.status())
        .unwrap_or_default();
    Ok(Json(status))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PrepareResourcesRequest {
    #[validate(length(min = 1, max = 300))]
    pub series: String,
    #[validate(length(min = 1, max = 300))]
    pub theme: String,
}

/// POST /api/projects/:project_id/resources
pub async fn prepare_resources(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
    Json(body): Json<PrepareResourcesRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(
        &state,
        JobKind::PrepareResources,
        &user.uid,
        Some(id.clone()),
        |job| {
            QueueJob::PrepareResources(PrepareResourcesJob {
                job_id: job.id.clone(),
                user_id: user.uid.clone(),
                project_id: id.clone(),
                series_name: body.series.clone(),
                theme_name: body.theme.clone(),
            })
        },
    )
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GeneratePlotRequest {
    #[validate(length(min = 1, max = 300))]
    pub series: String,
    #[validate(length(min = 1, max = 300))]
    pub theme: String,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_min: u32,
}

/// POST /api/projects/:project_id/plots
pub async fn generate_plot(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
    Json(body): Json<GeneratePlotRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(&state, JobKind::GeneratePlot, &user.uid, Some(id.clone()), |job| {
        QueueJob::GeneratePlot(GeneratePlotJob {
            job_id: job.id.clone(),
            user_id: user.uid.clone(),
            project_id: id.clone(),
            series_name: body.series.clone(),
            theme_name: body.theme.clone(),
            title: body.title.clone(),
            duration_min: body.duration_min,
        })
    })
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateScriptRequest {
    #[validate(length(min = 1, max = 300))]
    pub series: String,
    #[validate(length(min = 1, max = 300))]
    pub theme: String,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_min: u32,
    #[serde(default)]
    pub outline_index: Option<usize>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub sponsored: Option<String>,
}

/// POST /api/projects/:project_id/scripts
pub async fn generate_script(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
    Json(body): Json<GenerateScriptRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(&state, JobKind::GenerateScript, &user.uid, Some(id.clone()), |job| {
        QueueJob::GenerateScript(GenerateScriptJob {
            job_id: job.id.clone(),
            user_id: user.uid.clone(),
            project_id: id.clone(),
            series_name: body.series.clone(),
            theme_name: body.theme.clone(),
            title: body.title.clone(),
            duration_min: body.duration_min,
            outline_index: body.outline_index,
            characters: body.characters.clone(),
            host_name: body.host_name.clone(),
            sponsored: body.sponsored.clone(),
        })
    })
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateThumbnailsRequest {
    #[validate(length(min = 1, max = 300))]
    pub series: String,
    #[validate(length(min = 1, max = 300))]
    pub theme: String,
    #[validate(length(min = 1, max = 10))]
    pub concepts: Vec<String>,
}

/// POST /api/projects/:project_id/thumbnails
pub async fn generate_thumbnails(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    user: AuthUser,
    Json(body): Json<GenerateThumbnailsRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;
    let id = ProjectId::from(project_id);
    load_visible_project(&state, &id, &user.uid).await?;

    let job = create_and_enqueue(
        &state,
        JobKind::GenerateThumbnails,
        &user.uid,
        Some(id.clone()),
        |job| {
            QueueJob::GenerateThumbnails(GenerateThumbnailsJob {
                job_id: job.id.clone(),
                user_id: user.uid.clone(),
                project_id: id.clone(),
                series_name: body.series.clone(),
                theme_name: body.theme.clone(),
                concepts: body.concepts.clone(),
            })
        },
    )
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DiscoverRequest {
    #[validate(length(min = 2, max = 200))]
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /api/discover - standalone channel discovery.
pub async fn discover_channels(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<DiscoverRequest>,
) -> ApiResult<Json<JobAccepted>> {
    validate_body(&body)?;

    let job = create_and_enqueue(&state, JobKind::DiscoverChannels, &user.uid, None, |job| {
        QueueJob::DiscoverChannels(DiscoverChannelsJob {
            job_id: job.id.clone(),
            user_id: user.uid.clone(),
            query: body.query.clone(),
            limit: body.limit.unwrap_or(25).min(50),
        })
    })
    .await?;

    Ok(Json(JobAccepted {
        job_id: job.id.to_string(),
    }))
}
