//! HTML-scrape fallback for search.
//!
//! When every API key is out of quota, search falls back to fetching the
//! public results page and mining `ytInitialData` for video renderers.
//! The scrape returns the reduced [`SearchResult`] schema (no stats).

use serde_json::Value;
use tracing::debug;

use tscout_models::{ChannelId, VideoId};

use crate::error::{YoutubeError, YoutubeResult};
use crate::types::SearchResult;

/// Pull `ytInitialData` JSON out of a results page.
pub fn extract_initial_data(html: &str) -> YoutubeResult<Value> {
    // Both assignment forms have shipped over the years.
    let start = html
        .find("var ytInitialData = ")
        .map(|pos| pos + "var ytInitialData = ".len())
        .or_else(|| {
            html.find("window[\"ytInitialData\"] = ")
                .map(|pos| pos + "window[\"ytInitialData\"] = ".len())
        })
        .ok_or_else(|| YoutubeError::transient("ytInitialData not found in results page"))?;

    let rest = &html[start..];
    let end = rest
        .find(";</script>")
        .ok_or_else(|| YoutubeError::transient("unterminated ytInitialData block"))?;

    serde_json::from_str(&rest[..end]).map_err(YoutubeError::Json)
}

/// Parse search results out of a results page.
pub fn parse_search_page(html: &str, limit: usize) -> YoutubeResult<Vec<SearchResult>> {
    let data = extract_initial_data(html)?;
    let mut results = Vec::new();
    collect_video_renderers(&data, &mut results, limit);
    debug!("scrape fallback parsed {} results", results.len());
    Ok(results)
}

/// Depth-first walk collecting every `videoRenderer` node.
fn collect_video_renderers(value: &Value, out: &mut Vec<SearchResult>, limit: usize) {
    if out.len() >= limit {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(renderer) = map.get("videoRenderer") {
                if let Some(result) = video_renderer_to_result(renderer) {
                    out.push(result);
                    if out.len() >= limit {
                        return;
                    }
                }
            }
            for child in map.values() {
                collect_video_renderers(child, out, limit);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_video_renderers(child, out, limit);
            }
        }
        _ => {}
    }
}

fn video_renderer_to_result(renderer: &Value) -> Option<SearchResult> {
    let video_id = renderer.get("videoId")?.as_str()?;
    let title = renderer
        .pointer("/title/runs/0/text")
        .and_then(Value::as_str)?;
    let channel_id = renderer
        .pointer("/ownerText/runs/0/navigationEndpoint/browseEndpoint/browseId")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let channel_title = renderer
        .pointer("/ownerText/runs/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let thumbnail_url = renderer
        .pointer("/thumbnail/thumbnails/0/url")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(SearchResult {
        video_id: VideoId::from(video_id),
        title: title.to_string(),
        channel_id: ChannelId::from(channel_id),
        channel_title: channel_title.to_string(),
        thumbnail_url: thumbnail_url.to_string(),
        published_at: None,
    })
}
