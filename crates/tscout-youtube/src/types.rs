//! Public result types for the search client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tscout_models::{ChannelId, ChannelStats, VideoId};

/// One search hit. This is also the reduced schema the scrape fallback
/// can populate (stats-less).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_id: VideoId,
    pub title: String,
    pub channel_id: ChannelId,
    pub channel_title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Full channel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    pub id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stats: ChannelStats,
    /// Channel join date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Playlist id holding the channel's uploads.
    #[serde(default)]
    pub uploads_playlist_id: String,
}

/// Full video record with statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub id: VideoId,
    pub title: String,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// One caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Offset from the start of the video, in seconds.
    pub start_secs: f64,
    pub text: String,
}

/// A video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transcript {
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Render as `[HH:MM:SS] text` lines, the shape the analysis prompts
    /// expect.
    pub fn render_with_timestamps(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                let secs = line.start_secs.max(0.0) as u64;
                format!(
                    "[{:02}:{:02}:{:02}] {}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60,
                    line.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
