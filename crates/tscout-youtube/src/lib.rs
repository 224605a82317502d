//! YouTube Data API v3 client.
//!
//! This crate provides:
//! - Channel resolution from any channel URL shape
//! - Channel, video and search lookups with a rotating API key pool
//! - HTML-scrape fallback for search when the whole pool is quota-exhausted
//! - Transcript retrieval via the timedtext endpoint
//! - An in-memory TTL response cache

pub mod cache;
pub mod client;
pub mod duration;
pub mod error;
pub mod keypool;
pub mod scrape;
pub mod types;

pub use client::{YoutubeClient, YoutubeConfig};
pub use duration::parse_iso8601_duration;
pub use error::{YoutubeError, YoutubeResult};
pub use keypool::KeyPool;
pub use types::{ChannelData, SearchResult, Transcript, TranscriptLine, VideoDetail};
