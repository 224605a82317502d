//! Project (competitor group) document and its building blocks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::competitor::CompetitorChannel;
use crate::ids::{ChannelId, ProjectId, VideoId};
use crate::resources::ThemeResources;
use crate::taxonomy::TaxonomyTree;

/// Public channel statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ChannelStats {
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
}

/// The channel a project was seeded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeedChannel {
    pub id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub stats: ChannelStats,
    #[serde(default)]
    pub description: String,
    /// Channel join date, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// Summary of one video, as stored on the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSummary {
    pub id: VideoId,
    pub title: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: String,
    pub channel_id: ChannelId,
}

/// A candidate competitor surfaced by discovery, before selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateChannel {
    pub id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub stats: ChannelStats,
    #[serde(default)]
    pub thumbnail_url: String,
    /// The search hit that surfaced this channel.
    pub video: CandidateVideo,
}

/// The video search hit that surfaced a candidate channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateVideo {
    pub id: VideoId,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created; taxonomy and discovery not yet complete
    #[default]
    Initial,
    /// Discovery finished; candidates awaiting selection
    Discovered,
    /// Competitors selected and analyzed
    Finalized,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Initial => "initial",
            ProjectStatus::Discovered => "discovered",
            ProjectStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Averages over a project's finalized competitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct GroupMetrics {
    pub avg_monthly_views: f64,
    pub avg_monthly_subs: f64,
    pub avg_upload_frequency: f64,
    pub total_competitors: u32,
}

/// A competitor group: seed channel, taxonomy, discovered candidates,
/// finalized competitors, and all generated content resources.
///
/// The project exclusively owns everything below it; deleting the project
/// deletes the whole document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Internal id of the owning user.
    pub owner_id: String,
    /// Internal ids of users allowed to read the project.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    pub seed_channel: SeedChannel,
    #[serde(default)]
    pub seed_videos: Vec<VideoSummary>,
    #[serde(default)]
    pub taxonomy: TaxonomyTree,
    /// Series-name → ordered candidate list, filled by discovery.
    #[serde(default)]
    pub potential_competitors: BTreeMap<String, Vec<CandidateChannel>>,
    /// Series-name → query → raw search hits, kept for the selection UI.
    #[serde(default)]
    pub search_results: BTreeMap<String, BTreeMap<String, Vec<CandidateVideo>>>,
    #[serde(default)]
    pub competitors: Vec<CompetitorChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_metrics: Option<GroupMetrics>,
    /// Canonical resource key → generated content for that (series, theme).
    #[serde(default)]
    pub content_resources: BTreeMap<String, ThemeResources>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a freshly seeded project in `Initial` state.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        seed_channel: SeedChannel,
        seed_videos: Vec<VideoSummary>,
    ) -> Self {
        let owner_id = owner_id.into();
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            owner_id: owner_id.clone(),
            allowed_users: vec![owner_id],
            seed_channel,
            seed_videos,
            taxonomy: TaxonomyTree::default(),
            potential_competitors: BTreeMap::new(),
            search_results: BTreeMap::new(),
            competitors: Vec::new(),
            group_metrics: None,
            content_resources: BTreeMap::new(),
            status: ProjectStatus::Initial,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` may read this project.
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.allowed_users.iter().any(|u| u == user_id)
    }

    /// Whether a channel already appears among the finalized competitors.
    pub fn has_competitor(&self, channel_id: &ChannelId) -> bool {
        self.competitors.iter().any(|c| &c.channel_id == channel_id)
    }

    /// Refresh the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
