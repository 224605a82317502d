//! Finalized competitor channels and their derived metrics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, VideoId};
use crate::project::ChannelStats;

/// A series shared between the seed channel and a competitor.
///
/// A channel counts as sharing a series only when at least three of its
/// recent titles match the series' example titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatchingSeries {
    pub series_name: String,
    pub matching_titles: Vec<String>,
}

/// Minimum matching titles for a series to count as shared.
pub const SHARED_SERIES_THRESHOLD: usize = 3;

impl MatchingSeries {
    /// Whether the match clears the shared-series threshold.
    pub fn is_eligible(&self) -> bool {
        self.matching_titles.len() >= SHARED_SERIES_THRESHOLD
    }
}

/// One of a competitor's recent videos, annotated with the series it
/// matched (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompetitorVideo {
    pub video_id: VideoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// Derived performance metrics over a competitor's recent uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct CompetitorMetrics {
    /// Uploads per month over the observed window
    pub upload_frequency: f64,
    /// Estimated views per month
    pub monthly_views: u64,
    /// Estimated subscriber growth per month
    pub monthly_sub_growth: f64,
    /// Composite growth score
    pub growth_score: f64,
    /// Mean video duration in seconds
    pub avg_video_duration: f64,
    /// (likes + comments) / views
    pub engagement_rate: f64,
}

/// A finalized competitor channel on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompetitorChannel {
    pub channel_id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stats: ChannelStats,
    /// Channel join date, when the platform exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub videos: Vec<CompetitorVideo>,
    #[serde(default)]
    pub matching_series: Vec<MatchingSeries>,
    #[serde(default)]
    pub metrics: CompetitorMetrics,
    #[serde(default)]
    pub total_video_views: u64,
    #[serde(default)]
    pub total_video_likes: u64,
    #[serde(default)]
    pub total_video_comments: u64,
    #[serde(default)]
    pub average_views_per_video: f64,
    pub added_at: DateTime<Utc>,
}
