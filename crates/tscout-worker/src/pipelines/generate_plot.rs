//! Plot outline generation for a chosen title.

use tscout_models::resource_key;
use tscout_queue::GeneratePlotJob;
use tscout_script::OutlineGenerator;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: GeneratePlotJob,
) -> WorkerResult<()> {
    let project = load_project(ctx, &job.project_id).await?;
    let key = resource_key(&job.series_name, &job.theme_name);

    let breakdown = project
        .content_resources
        .get(&key)
        .and_then(|r| r.script_breakdown.as_ref())
        .ok_or_else(|| {
            WorkerError::job_failed("no script breakdown for this theme; prepare resources first")
        })?
        .script_breakdown
        .clone();

    tracker.checkpoint(15, "planning the outline").await?;
    let generator = OutlineGenerator::new(user.llm()?);
    let outline = generator
        .outline(
            &job.title,
            &breakdown,
            &job.series_name,
            &job.theme_name,
            job.duration_min,
        )
        .await?;

    tracker.checkpoint(90, "saving plot outline").await?;
    let mut index = 0;
    update_project(ctx, &job.project_id, |project| {
        if let Some(resources) = project.content_resources.get_mut(&key) {
            resources.plot_outlines.push(outline.clone());
            index = resources.plot_outlines.len() - 1;
        }
    })
    .await?;

    tracker
        .complete(format!(
            "projects/{}/content_resources/{key}/plot_outlines/{index}",
            job.project_id
        ))
        .await
}
