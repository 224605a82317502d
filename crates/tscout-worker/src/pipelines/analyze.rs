//! Competitor re-analysis: refresh stats and derived metrics.

use tscout_discovery::{build_competitor, group_metrics};
use tscout_queue::AnalyzeCompetitorsJob;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: AnalyzeCompetitorsJob,
) -> WorkerResult<()> {
    let youtube = user.youtube()?;
    let project = load_project(ctx, &job.project_id).await?;

    if project.competitors.is_empty() {
        return Err(WorkerError::job_failed("project has no competitors to analyze"));
    }

    let total = project.competitors.len();
    for (i, existing) in project.competitors.iter().enumerate() {
        let progress = 5 + (85 * i / total) as u8;
        tracker
            .checkpoint(progress, format!("refreshing channel {} of {total}", i + 1))
            .await?;

        // Refresh stats and uploads; keep the stored series matches.
        let channel = match youtube.fetch_channel(&existing.channel_id).await {
            Ok(channel) => channel,
            Err(e) => {
                tracker
                    .warn(format!("keeping stale data for {}: {e}", existing.channel_id))
                    .await?;
                continue;
            }
        };
        let videos = youtube
            .list_channel_videos(&existing.channel_id, ctx.config.competitor_video_limit)
            .await
            .unwrap_or_default();

        let refreshed = build_competitor(&channel, &videos, existing.matching_series.clone());

        update_project(ctx, &job.project_id, |project| {
            if let Some(slot) = project
                .competitors
                .iter_mut()
                .find(|c| c.channel_id == refreshed.channel_id)
            {
                *slot = refreshed.clone();
            }
        })
        .await?;
    }

    tracker.checkpoint(92, "recomputing group metrics").await?;
    update_project(ctx, &job.project_id, |project| {
        project.group_metrics = Some(group_metrics(&project.competitors));
    })
    .await?;

    tracker
        .complete(format!("projects/{}/group_metrics", job.project_id))
        .await
}
