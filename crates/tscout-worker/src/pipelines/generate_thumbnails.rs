//! Thumbnail rendering from a trained model and concept strings.

use tscout_models::resource_key;
use tscout_queue::GenerateThumbnailsJob;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

/// Renders requested per concept.
const OUTPUTS_PER_CONCEPT: u32 = 2;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: GenerateThumbnailsJob,
) -> WorkerResult<()> {
    if job.concepts.is_empty() {
        return Err(WorkerError::job_failed("no thumbnail concepts given"));
    }

    let project = load_project(ctx, &job.project_id).await?;
    let key = resource_key(&job.series_name, &job.theme_name);

    let thumbnail = project
        .content_resources
        .get(&key)
        .and_then(|r| r.thumbnail.as_ref())
        .ok_or_else(|| {
            WorkerError::job_failed("no thumbnail assets for this theme; prepare resources first")
        })?;
    if !thumbnail.has_trained_model() {
        return Err(WorkerError::job_failed(
            "thumbnail model is not trained for this theme",
        ));
    }
    let guidelines = thumbnail.guidelines.clone().ok_or_else(|| {
        WorkerError::job_failed("thumbnail guidelines missing for this theme")
    })?;
    let version = thumbnail.trained_model_version.clone().unwrap_or_default();
    let trigger = thumbnail.trigger_word.clone().unwrap_or_default();

    let image_model = user.image_model()?;
    let mut rendered: Vec<String> = Vec::new();

    let total = job.concepts.len();
    for (i, concept) in job.concepts.iter().enumerate() {
        let progress = 5 + (85 * i / total) as u8;
        tracker
            .checkpoint(progress, format!("rendering concept {} of {total}", i + 1))
            .await?;

        match image_model
            .generate(&version, &trigger, concept, &guidelines, OUTPUTS_PER_CONCEPT)
            .await
        {
            Ok(urls) => rendered.extend(urls),
            Err(e) => {
                tracker
                    .warn(format!("rendering '{concept}' failed: {e}"))
                    .await?;
            }
        }
    }

    if rendered.is_empty() {
        return Err(WorkerError::job_failed("every concept failed to render"));
    }

    tracker.checkpoint(95, "saving rendered thumbnails").await?;
    update_project(ctx, &job.project_id, |project| {
        if let Some(resources) = project.content_resources.get_mut(&key) {
            if let Some(thumbnail) = resources.thumbnail.as_mut() {
                for concept in &job.concepts {
                    if !thumbnail.concepts.contains(concept) {
                        thumbnail.concepts.push(concept.clone());
                    }
                }
                thumbnail.rendered_urls.extend(rendered.clone());
            }
        }
    })
    .await?;

    tracker
        .complete(format!(
            "projects/{}/content_resources/{key}/thumbnail",
            job.project_id
        ))
        .await
}
