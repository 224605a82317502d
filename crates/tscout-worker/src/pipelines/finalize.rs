//! Competitor finalization: enrich the selected candidates and compute
//! group metrics.

use tracing::{info, warn};

use tscout_discovery::{build_competitor, group_metrics, SharedSeriesDetector};
use tscout_models::ProjectStatus;
use tscout_queue::FinalizeCompetitorsJob;

use crate::context::{UserContext, WorkerContext};
use crate::error::WorkerResult;
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: FinalizeCompetitorsJob,
) -> WorkerResult<()> {
    let youtube = user.youtube()?;
    let detector = SharedSeriesDetector::new(user.llm()?);

    let project = load_project(ctx, &job.project_id).await?;
    let seed_id = project.seed_channel.id.clone();
    let taxonomy = project.taxonomy.clone();

    let total = job.selected_channel_ids.len().max(1);
    for (i, channel_id) in job.selected_channel_ids.iter().enumerate() {
        let progress = 5 + (85 * i / total) as u8;
        tracker
            .checkpoint(progress, format!("analyzing channel {} of {total}", i + 1))
            .await?;

        // The seed never becomes its own competitor; repeats are no-ops.
        if channel_id == &seed_id || project.has_competitor(channel_id) {
            continue;
        }

        let channel = match youtube.fetch_channel(channel_id).await {
            Ok(channel) => channel,
            Err(e) => {
                tracker.warn(format!("skipping {channel_id}: {e}")).await?;
                continue;
            }
        };
        let videos = youtube
            .list_channel_videos(channel_id, ctx.config.competitor_video_limit)
            .await
            .unwrap_or_else(|e| {
                warn!("failed to list videos for {channel_id}: {e}");
                Vec::new()
            });

        let titles: Vec<String> = videos.iter().map(|v| v.title.clone()).collect();
        let matching_series = detector.check_shared(&taxonomy, &titles).await?;
        let competitor = build_competitor(&channel, &videos, matching_series.clone());

        update_project(ctx, &job.project_id, |project| {
            // Idempotent add: a second finalize with the same channel
            // leaves exactly one entry.
            if !project.has_competitor(&competitor.channel_id) {
                for matched in &matching_series {
                    for series in &mut project.taxonomy.series {
                        if series.name == matched.series_name
                            && !series.channels_with_series.contains(&competitor.channel_id)
                        {
                            series.channels_with_series.push(competitor.channel_id.clone());
                        }
                    }
                }
                project.competitors.push(competitor.clone());
            }
        })
        .await?;

        info!(
            project = %job.project_id,
            channel = %channel_id,
            shared_series = matching_series.len(),
            "added competitor"
        );
    }

    tracker.checkpoint(92, "computing group metrics").await?;
    update_project(ctx, &job.project_id, |project| {
        project.group_metrics = Some(group_metrics(&project.competitors));
        project.status = ProjectStatus::Finalized;
    })
    .await?;

    tracker
        .complete(format!("projects/{}/competitors", job.project_id))
        .await
}
