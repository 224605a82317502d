//! Shared data models for the TubeScout backend.
//!
//! This crate provides Serde-serializable types for:
//! - Projects (competitor groups) and their owned sub-documents
//! - The series → theme → topic taxonomy
//! - Competitor channels and derived performance metrics
//! - Plot outlines, full scripts and script breakdowns
//! - Thumbnail guidelines and assets
//! - Background jobs and progress tracking
//! - Per-user service secrets
//! - Channel URL parsing and timestamp arithmetic

pub mod channel_url;
pub mod competitor;
pub mod ids;
pub mod job;
pub mod outline;
pub mod project;
pub mod resources;
pub mod script;
pub mod secrets;
pub mod taxonomy;
pub mod thumbnail;
pub mod timestamp;

pub use channel_url::{parse_channel_url, ChannelRef, ChannelUrlError};
pub use competitor::{
    CompetitorChannel, CompetitorMetrics, CompetitorVideo, MatchingSeries, SHARED_SERIES_THRESHOLD,
};
pub use ids::{ChannelId, JobId, ProjectId, VideoId};
pub use job::{Job, JobKind, JobState};
pub use outline::{
    is_generic_label, OutlineSegment, OutlineValidationError, PlotOutline, GENERIC_SEGMENT_LABELS,
    MAX_INTRO_SECS, MAX_SEGMENT_SECS,
};
pub use project::{
    CandidateChannel, CandidateVideo, ChannelStats, GroupMetrics, Project, ProjectStatus,
    SeedChannel, VideoSummary,
};
pub use resources::{resource_key, ResourceStatus, ThemeResources};
pub use script::{is_dialogue_line, FullScript, ScriptBreakdown, ScriptSegment, SEGMENT_BREAK};
pub use secrets::{SecretsSnapshot, UserSecret, services};
pub use taxonomy::{
    Series, SeriesWire, TaxonomyTree, Theme, ThemeWire, Topic, TopicWire, MISC_THEME_NAME,
};
pub use thumbnail::{guidance_scale_for_style, ThumbnailAssets, ThumbnailGuidelines, TrainingGuidance};
pub use timestamp::{Timecode, TimecodeError};
