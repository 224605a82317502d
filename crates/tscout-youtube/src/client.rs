//! The Data API client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use tscout_models::{parse_channel_url, ChannelId, ChannelRef, ChannelStats, VideoId};

use crate::cache::{ResponseCache, CHANNEL_TTL, SEARCH_TTL, VIDEO_TTL};
use crate::duration::parse_iso8601_duration;
use crate::error::{YoutubeError, YoutubeResult};
use crate::keypool::KeyPool;
use crate::scrape::parse_search_page;
use crate::types::{ChannelData, SearchResult, Transcript, TranscriptLine, VideoDetail};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub api_keys: Vec<String>,
    pub api_base_url: String,
    /// Base for the public results page (scrape fallback) and timedtext.
    pub web_base_url: String,
    pub timeout: Duration,
}

impl YoutubeConfig {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys,
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            web_base_url: "https://www.youtube.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from the `SEARCH_API_KEYS` environment variable.
    pub fn from_env() -> YoutubeResult<Self> {
        let csv = std::env::var("SEARCH_API_KEYS")
            .map_err(|_| YoutubeError::config("SEARCH_API_KEYS not set"))?;
        let pool = KeyPool::from_csv(&csv);
        if pool.is_empty() {
            return Err(YoutubeError::config("SEARCH_API_KEYS is empty"));
        }
        Ok(Self::new(pool.iter_from_current().map(String::from).collect()))
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_web_base_url(mut self, url: impl Into<String>) -> Self {
        self.web_base_url = url.into();
        self
    }
}

/// YouTube Data API v3 client with key rotation and a TTL cache.
pub struct YoutubeClient {
    http: Client,
    keys: KeyPool,
    cache: ResponseCache,
    config: YoutubeConfig,
}

impl YoutubeClient {
    pub fn new(config: YoutubeConfig) -> YoutubeResult<Self> {
        if config.api_keys.is_empty() {
            return Err(YoutubeError::config("no API keys configured"));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(YoutubeError::Network)?;
        Ok(Self {
            http,
            keys: KeyPool::new(config.api_keys.clone()),
            cache: ResponseCache::new(),
            config,
        })
    }

    pub fn from_env() -> YoutubeResult<Self> {
        Self::new(YoutubeConfig::from_env()?)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Resolve any channel URL shape to a canonical channel id.
    pub async fn resolve_channel(&self, url: &str) -> YoutubeResult<ChannelId> {
        let reference =
            parse_channel_url(url).map_err(|e| YoutubeError::InvalidUrl(e.to_string()))?;

        match reference {
            ChannelRef::Id(id) => Ok(ChannelId::from(id)),
            ChannelRef::Handle(handle) => {
                let handle_param = format!("@{handle}");
                let items = self
                    .channels_list(&[("forHandle", handle_param.as_str())])
                    .await?;
                items
                    .into_iter()
                    .next()
                    .map(|c| c.id)
                    .ok_or_else(|| YoutubeError::not_found(format!("handle @{handle}")))
            }
            ChannelRef::User(user) => {
                let items = self.channels_list(&[("forUsername", user.as_str())]).await?;
                items
                    .into_iter()
                    .next()
                    .map(|c| c.id)
                    .ok_or_else(|| YoutubeError::not_found(format!("user {user}")))
            }
            ChannelRef::Custom(name) => {
                // Legacy custom URLs have no lookup endpoint; a channel
                // search on the name is the accepted resolution path.
                let results = self.search_channels(&name, 1).await?;
                results
                    .into_iter()
                    .next()
                    .ok_or_else(|| YoutubeError::not_found(format!("custom URL {name}")))
            }
        }
    }

    /// Fetch a channel with statistics.
    pub async fn fetch_channel(&self, id: &ChannelId) -> YoutubeResult<ChannelData> {
        let cache_key = format!("channel:{id}");
        if let Some(cached) = self.cache.get::<ChannelData>(&cache_key).await {
            return Ok(cached);
        }

        let items = self.channels_list(&[("id", id.as_str())]).await?;
        let channel = items
            .into_iter()
            .next()
            .ok_or_else(|| YoutubeError::not_found(format!("channel {id}")))?;

        self.cache.put(cache_key, &channel, CHANNEL_TTL).await;
        Ok(channel)
    }

    /// List a channel's most recent uploads with statistics.
    pub async fn list_channel_videos(
        &self,
        id: &ChannelId,
        limit: usize,
    ) -> YoutubeResult<Vec<VideoDetail>> {
        let cache_key = format!("channel_videos:{id}:{limit}");
        if let Some(cached) = self.cache.get::<Vec<VideoDetail>>(&cache_key).await {
            return Ok(cached);
        }

        let channel = self.fetch_channel(id).await?;
        if channel.uploads_playlist_id.is_empty() {
            return Ok(Vec::new());
        }

        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        while video_ids.len() < limit {
            let page_size = (limit - video_ids.len()).min(50);
            let (ids, next) = self
                .playlist_items(&channel.uploads_playlist_id, page_size, page_token.as_deref())
                .await?;
            video_ids.extend(ids);
            page_token = next;
            if page_token.is_none() {
                break;
            }
        }
        video_ids.truncate(limit);

        let mut videos = Vec::with_capacity(video_ids.len());
        for chunk in video_ids.chunks(50) {
            videos.extend(self.videos_list(chunk).await?);
        }

        self.cache.put(cache_key, &videos, VIDEO_TTL).await;
        Ok(videos)
    }

    /// Search for videos. Falls back to the HTML scrape path when every
    /// key in the pool is quota-exhausted.
    pub async fn search(&self, query: &str, limit: usize) -> YoutubeResult<Vec<SearchResult>> {
        let cache_key = format!("search:{query}:{limit}");
        if let Some(cached) = self.cache.get::<Vec<SearchResult>>(&cache_key).await {
            return Ok(cached);
        }

        let results = match self.search_api(query, limit).await {
            Ok(results) => results,
            Err(e) if e.is_quota() => {
                info!("search quota exhausted across the pool, using scrape fallback");
                self.search_scrape(query, limit).await?
            }
            Err(e) => return Err(e),
        };

        self.cache.put(cache_key, &results, SEARCH_TTL).await;
        Ok(results)
    }

    /// Fetch one video with statistics.
    pub async fn get_video(&self, id: &VideoId) -> YoutubeResult<VideoDetail> {
        let cache_key = format!("video:{id}");
        if let Some(cached) = self.cache.get::<VideoDetail>(&cache_key).await {
            return Ok(cached);
        }

        let videos = self.videos_list(&[id.as_str().to_string()]).await?;
        let video = videos
            .into_iter()
            .next()
            .ok_or_else(|| YoutubeError::not_found(format!("video {id}")))?;

        self.cache.put(cache_key, &video, VIDEO_TTL).await;
        Ok(video)
    }

    /// Fetch a video's transcript, if captions exist.
    pub async fn get_transcript(&self, id: &VideoId) -> YoutubeResult<Option<Transcript>> {
        let url = format!(
            "{}/api/timedtext?v={}&lang=en&fmt=json3",
            self.config.web_base_url,
            urlencoding::encode(id.as_str())
        );

        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(YoutubeError::transient(format!(
                "timedtext returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let wire: TimedTextResponse = serde_json::from_str(&body)?;
        let lines: Vec<TranscriptLine> = wire
            .events
            .into_iter()
            .filter_map(|event| {
                let text: String = event
                    .segs
                    .iter()
                    .map(|seg| seg.utf8.as_str())
                    .collect::<Vec<_>>()
                    .join("");
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(TranscriptLine {
                        start_secs: event.t_start_ms as f64 / 1000.0,
                        text,
                    })
                }
            })
            .collect();

        if lines.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Transcript { lines }))
        }
    }

    // ========================================================================
    // API plumbing
    // ========================================================================

    /// Run `request` once per pool key until one is not quota-limited.
    async fn with_key_rotation<T, F, Fut>(&self, op: &str, request: F) -> YoutubeResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = YoutubeResult<T>>,
    {
        let mut last_quota: Option<YoutubeError> = None;
        for key in self.keys.iter_from_current() {
            match request(key.to_string()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_quota() => {
                    warn!("API key out of quota for {op}, rotating");
                    self.keys.rotate();
                    last_quota = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_quota.unwrap_or_else(|| YoutubeError::config("no API keys configured")))
    }

    async fn api_get(&self, path: &str, params: &[(&str, &str)], key: &str) -> YoutubeResult<String> {
        let mut url = format!("{}/{}?key={}", self.config.api_base_url, path, key);
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if status == reqwest::StatusCode::FORBIDDEN && is_quota_body(&body) {
            return Err(YoutubeError::quota(format!("{path} quota exhausted")));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(YoutubeError::not_found(path.to_string()));
        }

        Err(YoutubeError::Api {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn channels_list(&self, selector: &[(&str, &str)]) -> YoutubeResult<Vec<ChannelData>> {
        let mut params = vec![("part", "snippet,statistics,contentDetails")];
        params.extend_from_slice(selector);
        let body = self
            .with_key_rotation("channels.list", |key| {
                let params = params.clone();
                async move { self.api_get("channels", &params, &key).await }
            })
            .await?;

        let wire: ChannelListResponse = serde_json::from_str(&body)?;
        Ok(wire
            .items
            .unwrap_or_default()
            .into_iter()
            .map(ChannelData::from)
            .collect())
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> YoutubeResult<(Vec<String>, Option<String>)> {
        let page_size = page_size.to_string();
        let body = self
            .with_key_rotation("playlistItems.list", |key| {
                let mut params = vec![
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", page_size.as_str()),
                ];
                if let Some(token) = page_token {
                    params.push(("pageToken", token));
                }
                async move { self.api_get("playlistItems", &params, &key).await }
            })
            .await?;

        let wire: PlaylistItemsResponse = serde_json::from_str(&body)?;
        let ids = wire
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.content_details.map(|d| d.video_id))
            .collect();
        Ok((ids, wire.next_page_token))
    }

    async fn videos_list(&self, ids: &[String]) -> YoutubeResult<Vec<VideoDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let body = self
            .with_key_rotation("videos.list", |key| {
                let params = vec![
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", joined.as_str()),
                ];
                async move { self.api_get("videos", &params, &key).await }
            })
            .await?;

        let wire: VideoListResponse = serde_json::from_str(&body)?;
        Ok(wire
            .items
            .unwrap_or_default()
            .into_iter()
            .map(VideoDetail::from)
            .collect())
    }

    async fn search_api(&self, query: &str, limit: usize) -> YoutubeResult<Vec<SearchResult>> {
        let max_results = limit.min(50).to_string();
        let body = self
            .with_key_rotation("search.list", |key| {
                let params = vec![
                    ("part", "snippet"),
                    ("type", "video"),
                    ("q", query),
                    ("maxResults", max_results.as_str()),
                ];
                async move { self.api_get("search", &params, &key).await }
            })
            .await?;

        let wire: SearchListResponse = serde_json::from_str(&body)?;
        Ok(wire
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(SearchResult::from_wire)
            .collect())
    }

    async fn search_channels(&self, query: &str, limit: usize) -> YoutubeResult<Vec<ChannelId>> {
        let max_results = limit.min(50).to_string();
        let body = self
            .with_key_rotation("search.list", |key| {
                let params = vec![
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("q", query),
                    ("maxResults", max_results.as_str()),
                ];
                async move { self.api_get("search", &params, &key).await }
            })
            .await?;

        let wire: SearchListResponse = serde_json::from_str(&body)?;
        Ok(wire
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.id.and_then(|id| id.channel_id).map(ChannelId::from))
            .collect())
    }

    async fn search_scrape(&self, query: &str, limit: usize) -> YoutubeResult<Vec<SearchResult>> {
        let url = format!(
            "{}/results?search_query={}",
            self.config.web_base_url,
            urlencoding::encode(query)
        );
        debug!("scraping search results page for '{query}'");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(YoutubeError::transient(format!(
                "results page returned {}",
                response.status()
            )));
        }
        let html = response.text().await?;
        parse_search_page(&html, limit)
    }
}

fn is_quota_body(body: &str) -> bool {
    body.contains("quotaExceeded")
        || body.contains("dailyLimitExceeded")
        || body.contains("rateLimitExceeded")
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    items: Option<Vec<ChannelItem>>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<ChannelStatistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best_url(&self) -> String {
        self.medium
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelStatistics {
    #[serde(rename = "subscriberCount", default)]
    subscriber_count: String,
    #[serde(rename = "videoCount", default)]
    video_count: String,
    #[serde(rename = "viewCount", default)]
    view_count: String,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

impl From<ChannelItem> for ChannelData {
    fn from(item: ChannelItem) -> Self {
        let snippet = item.snippet;
        let stats = item.statistics;
        ChannelData {
            id: ChannelId::from(item.id),
            title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
            description: snippet
                .as_ref()
                .map(|s| s.description.clone())
                .unwrap_or_default(),
            stats: ChannelStats {
                subscriber_count: stats
                    .as_ref()
                    .map(|s| s.subscriber_count.parse().unwrap_or(0))
                    .unwrap_or(0),
                video_count: stats
                    .as_ref()
                    .map(|s| s.video_count.parse().unwrap_or(0))
                    .unwrap_or(0),
                view_count: stats
                    .as_ref()
                    .map(|s| s.view_count.parse().unwrap_or(0))
                    .unwrap_or(0),
            },
            published_at: snippet.as_ref().and_then(|s| s.published_at),
            thumbnail_url: snippet
                .as_ref()
                .and_then(|s| s.thumbnails.as_ref())
                .map(|t| t.best_url())
                .unwrap_or_default(),
            uploads_playlist_id: item
                .content_details
                .and_then(|d| d.related_playlists)
                .and_then(|p| p.uploads)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    items: Option<Vec<PlaylistItem>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    items: Option<Vec<VideoItem>>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<VideoStatistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: String,
    #[serde(rename = "likeCount", default)]
    like_count: String,
    #[serde(rename = "commentCount", default)]
    comment_count: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

impl From<VideoItem> for VideoDetail {
    fn from(item: VideoItem) -> Self {
        let snippet = item.snippet;
        let stats = item.statistics;
        VideoDetail {
            id: VideoId::from(item.id),
            title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
            channel_id: ChannelId::from(
                snippet
                    .as_ref()
                    .and_then(|s| s.channel_id.clone())
                    .unwrap_or_default(),
            ),
            view_count: stats
                .as_ref()
                .map(|s| s.view_count.parse().unwrap_or(0))
                .unwrap_or(0),
            like_count: stats
                .as_ref()
                .map(|s| s.like_count.parse().unwrap_or(0))
                .unwrap_or(0),
            comment_count: stats
                .as_ref()
                .map(|s| s.comment_count.parse().unwrap_or(0))
                .unwrap_or(0),
            duration_seconds: item
                .content_details
                .map(|d| parse_iso8601_duration(&d.duration))
                .unwrap_or(0),
            published_at: snippet.as_ref().and_then(|s| s.published_at),
            thumbnail_url: snippet
                .as_ref()
                .and_then(|s| s.thumbnails.as_ref())
                .map(|t| t.best_url())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

impl SearchResult {
    fn from_wire(item: SearchItem) -> Option<Self> {
        let video_id = item.id.and_then(|id| id.video_id)?;
        let snippet = item.snippet?;
        Some(SearchResult {
            video_id: VideoId::from(video_id),
            title: snippet.title.clone(),
            channel_id: ChannelId::from(snippet.channel_id.clone().unwrap_or_default()),
            channel_title: snippet.channel_title.clone().unwrap_or_default(),
            thumbnail_url: snippet
                .thumbnails
                .as_ref()
                .map(|t| t.best_url())
                .unwrap_or_default(),
            published_at: snippet.published_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    t_start_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}
