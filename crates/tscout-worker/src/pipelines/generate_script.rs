//! Full script generation.

use tscout_models::resource_key;
use tscout_queue::GenerateScriptJob;
use tscout_script::{FullScriptGenerator, OutlineGenerator, ScriptRequest};

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: GenerateScriptJob,
) -> WorkerResult<()> {
    let llm = user.llm()?;
    let project = load_project(ctx, &job.project_id).await?;
    let key = resource_key(&job.series_name, &job.theme_name);

    let resources = project.content_resources.get(&key).ok_or_else(|| {
        WorkerError::job_failed("no resources for this theme; prepare resources first")
    })?;
    let breakdown = resources
        .script_breakdown
        .as_ref()
        .ok_or_else(|| {
            WorkerError::job_failed("no script breakdown for this theme; prepare resources first")
        })?
        .script_breakdown
        .clone();

    // Reuse a stored outline when the caller picked one; otherwise plan
    // a fresh outline first.
    let outline = match job.outline_index {
        Some(index) => resources
            .plot_outlines
            .get(index)
            .cloned()
            .ok_or_else(|| WorkerError::job_failed(format!("no plot outline at index {index}")))?,
        None => {
            tracker.checkpoint(10, "planning the outline").await?;
            OutlineGenerator::new(llm.clone())
                .outline(
                    &job.title,
                    &breakdown,
                    &job.series_name,
                    &job.theme_name,
                    job.duration_min,
                )
                .await?
        }
    };

    tracker.checkpoint(30, "writing script segments").await?;
    let host_name = job.host_name.clone().unwrap_or_else(|| "HOST".to_string());
    let generator = FullScriptGenerator::new(llm);
    let output = generator
        .full_script(&ScriptRequest {
            title: job.title.clone(),
            series_name: job.series_name.clone(),
            theme_name: job.theme_name.clone(),
            outline: outline.clone(),
            breakdown,
            characters: job.characters.clone(),
            host_name,
            sponsored: job.sponsored.clone(),
        })
        .await?;

    // Placeholders do not fail the job, but every one is recorded.
    for message in &output.segment_errors {
        tracker.warn(message.clone()).await?;
    }

    tracker.checkpoint(90, "saving script").await?;
    let mut index = 0;
    update_project(ctx, &job.project_id, |project| {
        if let Some(resources) = project.content_resources.get_mut(&key) {
            if job.outline_index.is_none() {
                resources.plot_outlines.push(outline.clone());
            }
            resources.full_scripts.push(output.script.clone());
            index = resources.full_scripts.len() - 1;
        }
    })
    .await?;

    tracker
        .complete_with_result(
            format!(
                "projects/{}/content_resources/{key}/full_scripts/{index}",
                job.project_id
            ),
            serde_json::json!({
                "total_cost": output.cost.total_cost,
                "input_tokens": output.cost.usage.input_tokens,
                "output_tokens": output.cost.usage.output_tokens,
                "cache_read_tokens": output.cost.usage.cache_read_input_tokens,
                "segments": output.script.segments.len(),
                "placeholders": output.segment_errors.len(),
            }),
        )
        .await
}
