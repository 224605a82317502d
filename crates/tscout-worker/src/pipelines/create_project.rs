//! Project creation: seed resolution, taxonomy extraction, discovery.

use tracing::info;

use tscout_discovery::CompetitorDiscovery;
use tscout_models::{Project, ProjectStatus, SeedChannel, VideoSummary};
use tscout_queue::CreateProjectJob;
use tscout_taxonomy::TaxonomyExtractor;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::update_project;
use crate::progress::JobTracker;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    tracker: JobTracker,
    job: CreateProjectJob,
) -> WorkerResult<()> {
    let mut tracker = tracker.without_project_check();
    let youtube = user.youtube()?;
    let llm = user.llm()?;

    tracker.checkpoint(5, "resolving seed channel").await?;
    let channel_id = youtube.resolve_channel(&job.seed_channel_url).await?;

    // One project per seed channel.
    if let Some(existing) = ctx.projects.find_by_seed_channel(&channel_id).await? {
        return Err(WorkerError::job_failed(format!(
            "channel {channel_id} already belongs to project {existing}"
        )));
    }

    tracker.checkpoint(10, "fetching channel videos").await?;
    let channel = youtube.fetch_channel(&channel_id).await?;
    let videos = youtube
        .list_channel_videos(&channel_id, ctx.config.seed_video_limit)
        .await?;
    if videos.is_empty() {
        return Err(WorkerError::job_failed("no videos found on seed channel"));
    }

    let seed_videos: Vec<VideoSummary> = videos
        .iter()
        .map(|video| VideoSummary {
            id: video.id.clone(),
            title: video.title.clone(),
            views: video.view_count,
            likes: video.like_count,
            comments: video.comment_count,
            duration_seconds: video.duration_seconds,
            published_at: video.published_at,
            thumbnail_url: video.thumbnail_url.clone(),
            channel_id: channel_id.clone(),
        })
        .collect();

    let mut project = Project::new(
        job.name.clone(),
        user.user_id.clone(),
        SeedChannel {
            id: channel.id.clone(),
            title: channel.title.clone(),
            stats: channel.stats.clone(),
            description: channel.description.clone(),
            published_at: channel.published_at,
            thumbnail_url: channel.thumbnail_url.clone(),
        },
        seed_videos.clone(),
    );
    // The API already promised this id to the caller.
    project.id = job.project_id.clone();
    ctx.projects.create(&project).await?;
    tracker.expect_project();

    info!(project = %project.id, videos = seed_videos.len(), "seeded project");

    tracker.checkpoint(25, "classifying video titles").await?;
    let extractor = TaxonomyExtractor::new(llm);
    let taxonomy = extractor.classify(&seed_videos, &channel.title).await?;

    update_project(ctx, &job.project_id, |project| {
        project.taxonomy = taxonomy.clone();
    })
    .await?;

    tracker.checkpoint(60, "discovering competitor channels").await?;
    let discovery = CompetitorDiscovery::new(&youtube);
    let outcome = discovery.discover(&channel_id, &taxonomy).await?;

    tracker.checkpoint(90, "saving discovery results").await?;
    update_project(ctx, &job.project_id, |project| {
        project.potential_competitors = outcome.potential_competitors;
        project.search_results = outcome.search_results;
        project.status = ProjectStatus::Discovered;
    })
    .await?;

    tracker
        .complete(format!("projects/{}/potential_competitors", job.project_id))
        .await
}
