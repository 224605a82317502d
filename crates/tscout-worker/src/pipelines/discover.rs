//! Standalone channel discovery with revenue estimates.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use tscout_discovery::{estimate_monthly_revenue, metrics::DAYS_PER_MONTH};
use tscout_models::ChannelId;
use tscout_queue::DiscoverChannelsJob;

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::progress::JobTracker;

/// One discovered channel with its revenue estimate.
#[derive(Debug, Serialize)]
struct DiscoveredChannel {
    channel_id: ChannelId,
    title: String,
    subscriber_count: u64,
    video_count: u64,
    view_count: u64,
    channel_age_days: i64,
    estimated_monthly_views: f64,
    estimated_monthly_revenue: f64,
    thumbnail_url: String,
}

pub async fn run(
    _ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: DiscoverChannelsJob,
) -> WorkerResult<()> {
    if job.query.trim().is_empty() {
        return Err(WorkerError::job_failed("empty discovery query"));
    }

    let youtube = user.youtube()?;

    tracker.checkpoint(10, "searching channels").await?;
    let hits = youtube.search(&job.query, job.limit.max(10)).await?;

    // One entry per channel, first hit wins.
    let mut by_channel: BTreeMap<String, ChannelId> = BTreeMap::new();
    for hit in &hits {
        if !hit.channel_id.as_str().is_empty() {
            by_channel
                .entry(hit.channel_id.as_str().to_string())
                .or_insert_with(|| hit.channel_id.clone());
        }
    }

    let mut discovered = Vec::new();
    let total = by_channel.len().max(1);
    for (i, channel_id) in by_channel.values().enumerate() {
        let progress = 15 + (75 * i / total) as u8;
        tracker
            .checkpoint(progress, format!("profiling channel {} of {total}", i + 1))
            .await?;

        let Ok(channel) = youtube.fetch_channel(channel_id).await else {
            continue;
        };

        let age_days = channel
            .published_at
            .map(|at| (Utc::now() - at).num_days().max(1))
            .unwrap_or(1);
        let monthly_views =
            channel.stats.view_count as f64 / (age_days as f64 / DAYS_PER_MONTH).max(1.0);
        // Average duration is unknown from channel stats alone; the
        // estimator falls back to its default bucket.
        let revenue = estimate_monthly_revenue(monthly_views, 0.0, &job.query);

        discovered.push(DiscoveredChannel {
            channel_id: channel.id,
            title: channel.title,
            subscriber_count: channel.stats.subscriber_count,
            video_count: channel.stats.video_count,
            view_count: channel.stats.view_count,
            channel_age_days: age_days,
            estimated_monthly_views: monthly_views,
            estimated_monthly_revenue: revenue,
            thumbnail_url: channel.thumbnail_url,
        });
    }

    discovered.sort_by(|a, b| {
        b.estimated_monthly_revenue
            .total_cmp(&a.estimated_monthly_revenue)
    });

    let job_id = tracker.job().id.clone();
    tracker
        .complete_with_result(
            format!("jobs/{job_id}/result"),
            serde_json::json!({
                "query": job.query,
                "channels": discovered,
            }),
        )
        .await
}
