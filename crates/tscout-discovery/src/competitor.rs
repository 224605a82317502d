//! Competitor enrichment: derived metrics over a channel's recent uploads.

use chrono::{DateTime, Utc};

use tscout_models::{CompetitorChannel, CompetitorMetrics, CompetitorVideo, MatchingSeries};
use tscout_youtube::{ChannelData, VideoDetail};

use crate::metrics::DAYS_PER_MONTH;

/// Uploads per month over the observed window.
pub fn upload_frequency(published: &[DateTime<Utc>]) -> f64 {
    if published.is_empty() {
        return 0.0;
    }
    let oldest = published.iter().min().copied().unwrap_or_else(Utc::now);
    let newest = published.iter().max().copied().unwrap_or_else(Utc::now);
    let span_days = (newest - oldest).num_days().max(1) as f64;
    let months = span_days / DAYS_PER_MONTH;
    round2(published.len() as f64 / months)
}

/// Estimated views per month over the observed window.
pub fn monthly_views(total_views: u64, published: &[DateTime<Utc>]) -> u64 {
    if published.is_empty() {
        return 0;
    }
    let oldest = published.iter().min().copied().unwrap_or_else(Utc::now);
    let newest = published.iter().max().copied().unwrap_or_else(Utc::now);
    let months_active = ((newest - oldest).num_days() as f64 / DAYS_PER_MONTH).max(1.0);
    (total_views as f64 / months_active) as u64
}

/// Estimated subscriber growth per month over the channel's lifetime.
/// When the join date is unknown, falls back to 1% of the sub count.
pub fn monthly_sub_growth(
    subscriber_count: u64,
    channel_published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(published_at) = channel_published_at else {
        return subscriber_count as f64 * 0.01;
    };
    let months = (now - published_at).num_days() as f64 / DAYS_PER_MONTH;
    if months <= 0.0 {
        return 0.0;
    }
    subscriber_count as f64 / months
}

/// Composite growth score:
/// `monthly_views/1000 + monthly_sub_growth×10 + upload_frequency×5`.
pub fn growth_score(monthly_views: u64, monthly_sub_growth: f64, upload_frequency: f64) -> f64 {
    round2(monthly_views as f64 / 1000.0 + monthly_sub_growth * 10.0 + upload_frequency * 5.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build a finalized competitor from its channel record, recent uploads
/// and matched series.
pub fn build_competitor(
    channel: &ChannelData,
    videos: &[VideoDetail],
    matching_series: Vec<MatchingSeries>,
) -> CompetitorChannel {
    let now = Utc::now();

    let mut total_views = 0u64;
    let mut total_likes = 0u64;
    let mut total_comments = 0u64;
    let mut total_duration = 0u64;
    let mut published: Vec<DateTime<Utc>> = Vec::new();

    let competitor_videos: Vec<CompetitorVideo> = videos
        .iter()
        .map(|video| {
            total_views += video.view_count;
            total_likes += video.like_count;
            total_comments += video.comment_count;
            total_duration += video.duration_seconds;
            if let Some(at) = video.published_at {
                published.push(at);
            }
            CompetitorVideo {
                video_id: video.id.clone(),
                title: video.title.clone(),
                published_at: video.published_at,
                view_count: video.view_count,
                like_count: video.like_count,
                comment_count: video.comment_count,
                duration_seconds: video.duration_seconds,
                series_name: matching_series
                    .iter()
                    .find(|series| series.matching_titles.iter().any(|t| t == &video.title))
                    .map(|series| series.series_name.clone()),
                thumbnail_url: video.thumbnail_url.clone(),
            }
        })
        .collect();

    let video_count = competitor_videos.len();
    let upload_frequency = upload_frequency(&published);
    let monthly_views = monthly_views(total_views, &published);
    let monthly_sub_growth =
        monthly_sub_growth(channel.stats.subscriber_count, channel.published_at, now);

    CompetitorChannel {
        channel_id: channel.id.clone(),
        title: channel.title.clone(),
        description: channel.description.clone(),
        stats: channel.stats.clone(),
        published_at: channel.published_at,
        thumbnail_url: channel.thumbnail_url.clone(),
        videos: competitor_videos,
        matching_series,
        metrics: CompetitorMetrics {
            upload_frequency,
            monthly_views,
            monthly_sub_growth,
            growth_score: growth_score(monthly_views, monthly_sub_growth, upload_frequency),
            avg_video_duration: if video_count > 0 {
                total_duration as f64 / video_count as f64
            } else {
                0.0
            },
            engagement_rate: if total_views > 0 {
                (total_likes + total_comments) as f64 / total_views as f64
            } else {
                0.0
            },
        },
        total_video_views: total_views,
        total_video_likes: total_likes,
        total_video_comments: total_comments,
        average_views_per_video: if video_count > 0 {
            total_views as f64 / video_count as f64
        } else {
            0.0
        },
        added_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tscout_models::{ChannelId, ChannelStats, VideoId};

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn upload_frequency_over_window() {
        // 10 uploads over ~3 months.
        let published: Vec<DateTime<Utc>> = (0..10)
            .map(|i| date(2025, 1, 1) + chrono::Duration::days(i * 10))
            .collect();
        let freq = upload_frequency(&published);
        // 90 days / 30.44 ≈ 2.957 months; 10 / 2.957 ≈ 3.38.
        assert!((freq - 3.38).abs() < 0.01);
    }

    #[test]
    fn short_windows_clamp_to_one_day() {
        let published = vec![date(2025, 1, 1), date(2025, 1, 1)];
        // Span clamps to 1 day → months ≈ 0.0329 → very high frequency,
        // but finite and positive.
        let freq = upload_frequency(&published);
        assert!(freq > 0.0);
        assert!(freq.is_finite());
    }

    #[test]
    fn monthly_views_clamps_months_to_one() {
        let published = vec![date(2025, 1, 1), date(2025, 1, 5)];
        // 4-day span clamps to one month.
        assert_eq!(monthly_views(60_000, &published), 60_000);
    }

    #[test]
    fn sub_growth_falls_back_to_one_percent() {
        assert!((monthly_sub_growth(50_000, None, Utc::now()) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn sub_growth_over_channel_age() {
        let now = date(2025, 1, 1);
        let joined = date(2020, 1, 1);
        // ~60 months.
        let growth = monthly_sub_growth(60_000, Some(joined), now);
        assert!((growth - 60_000.0 / ((now - joined).num_days() as f64 / DAYS_PER_MONTH)).abs() < 1e-9);
    }

    #[test]
    fn growth_score_formula() {
        let score = growth_score(50_000, 120.0, 4.0);
        assert!((score - (50.0 + 1200.0 + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn build_competitor_aggregates_and_tags_series() {
        let channel = ChannelData {
            id: ChannelId::from("UCrival"),
            title: "Rival".to_string(),
            description: String::new(),
            stats: ChannelStats {
                subscriber_count: 10_000,
                video_count: 2,
                view_count: 1_000_000,
            },
            published_at: Some(date(2023, 1, 1)),
            thumbnail_url: String::new(),
            uploads_playlist_id: "UU".to_string(),
        };
        let videos = vec![
            VideoDetail {
                id: VideoId::from("v1"),
                title: "Matched Title".to_string(),
                channel_id: channel.id.clone(),
                view_count: 1000,
                like_count: 50,
                comment_count: 10,
                duration_seconds: 600,
                published_at: Some(date(2024, 6, 1)),
                thumbnail_url: String::new(),
            },
            VideoDetail {
                id: VideoId::from("v2"),
                title: "Unmatched".to_string(),
                channel_id: channel.id.clone(),
                view_count: 3000,
                like_count: 100,
                comment_count: 20,
                duration_seconds: 1200,
                published_at: Some(date(2024, 9, 1)),
                thumbnail_url: String::new(),
            },
        ];
        let matching = vec![MatchingSeries {
            series_name: "History for Sleep".to_string(),
            matching_titles: vec!["Matched Title".to_string(), "a".into(), "b".into()],
        }];

        let competitor = build_competitor(&channel, &videos, matching);

        assert_eq!(competitor.total_video_views, 4000);
        assert_eq!(competitor.videos[0].series_name.as_deref(), Some("History for Sleep"));
        assert_eq!(competitor.videos[1].series_name, None);
        assert!((competitor.metrics.avg_video_duration - 900.0).abs() < 1e-9);
        assert!((competitor.metrics.engagement_rate - 180.0 / 4000.0).abs() < 1e-9);
        assert!((competitor.average_views_per_video - 2000.0).abs() < 1e-9);
    }
}
