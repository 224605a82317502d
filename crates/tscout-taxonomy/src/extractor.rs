//! The batched extractor.

use serde::Deserialize;
use tracing::{info, warn};

use tscout_llm::{ChatRequest, LlmClient, LlmError};
use tscout_models::{SeriesWire, TaxonomyTree, VideoSummary};

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::merge::{build_tree, merge_wire};
use crate::prompts;

/// Titles per classification batch.
pub const BATCH_SIZE: usize = 80;

/// Hard cap on classified videos per channel.
pub const MAX_VIDEOS: usize = 9000;

/// Attempts per batch before it is skipped.
const BATCH_RETRIES: u32 = 5;

/// Wire root returned by the classification model.
#[derive(Debug, Deserialize)]
struct TaxonomyWireRoot {
    #[serde(default)]
    series: Vec<SeriesWire>,
}

/// Batched title-to-hierarchy classifier.
pub struct TaxonomyExtractor {
    llm: LlmClient,
    batch_size: usize,
}

impl TaxonomyExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            batch_size: BATCH_SIZE,
        }
    }

    /// Override the batch size (tests use small batches).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Classify `videos` into a taxonomy tree.
    ///
    /// Batches are processed sequentially; each carries the merged state
    /// of all prior batches. A batch that keeps failing contributes
    /// nothing but does not abort the extraction. The returned tree
    /// covers every input title exactly once.
    pub async fn classify(
        &self,
        videos: &[VideoSummary],
        channel_title: &str,
    ) -> TaxonomyResult<TaxonomyTree> {
        if videos.is_empty() {
            return Err(TaxonomyError::validation("no video titles"));
        }

        let videos = &videos[..videos.len().min(MAX_VIDEOS)];
        let system = prompts::classification_system(channel_title);
        let mut running: Vec<SeriesWire> = Vec::new();

        let batch_count = videos.len().div_ceil(self.batch_size);
        for (batch_index, batch) in videos.chunks(self.batch_size).enumerate() {
            let titles: Vec<&str> = batch.iter().map(|v| v.title.as_str()).collect();

            let user = if batch_index == 0 {
                prompts::initial_batch_user(&titles)
            } else {
                let hierarchy = serde_json::to_string(&running)
                    .map_err(|e| TaxonomyError::Llm(LlmError::Json(e)))?;
                prompts::merge_batch_user(&hierarchy, &titles)
            };

            match self.classify_batch(&system, &user).await {
                Some(wire) => {
                    merge_wire(&mut running, wire.series);
                    info!(
                        batch = batch_index + 1,
                        of = batch_count,
                        series = running.len(),
                        "classified title batch"
                    );
                }
                None => {
                    warn!(
                        batch = batch_index + 1,
                        of = batch_count,
                        "batch failed after {BATCH_RETRIES} attempts, its titles will fall back to Miscellaneous"
                    );
                }
            }
        }

        Ok(build_tree(&running, videos))
    }

    /// One batch, retried on parse failures. Refusals abort immediately.
    async fn classify_batch(&self, system: &str, user: &str) -> Option<TaxonomyWireRoot> {
        let request = ChatRequest::new()
            .system_cached(system.to_string())
            .user(user.to_string())
            .max_tokens(8192)
            .temperature(0.2);

        for attempt in 0..BATCH_RETRIES {
            match self.llm.call_structured::<TaxonomyWireRoot>(&request).await {
                Ok((wire, _)) => return Some(wire),
                Err(LlmError::Refusal(message)) => {
                    warn!("classification refused, not retrying: {message}");
                    return None;
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, "batch classification failed: {e}");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_llm::LlmConfig;
    use tscout_models::{ChannelId, VideoId};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    fn video(title: &str, views: u64) -> VideoSummary {
        VideoSummary {
            id: VideoId::from(format!("v{views}")),
            title: title.to_string(),
            views,
            likes: 0,
            comments: 0,
            duration_seconds: 0,
            published_at: None,
            thumbnail_url: String::new(),
            channel_id: ChannelId::from("UCseed"),
        }
    }

    fn message_with(hierarchy: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "msg", "type": "message", "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": hierarchy.to_string()}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 500, "output_tokens": 200}
        })
    }

    async fn extractor_for(server: &MockServer) -> TaxonomyExtractor {
        let config = LlmConfig::new("test-key").with_base_url(server.uri());
        TaxonomyExtractor::new(LlmClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn empty_input_is_a_validation_error() {
        let server = MockServer::start().await;
        let extractor = extractor_for(&server).await;
        let err = extractor.classify(&[], "Channel").await.unwrap_err();
        match err {
            TaxonomyError::Validation(message) => assert_eq!(message, "no video titles"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_batch_classification() {
        let server = MockServer::start().await;
        let hierarchy = json!({"series": [{"name": "History for Sleep", "themes": [
            {"name": "Rome", "topics": [
                {"name": "Fall of Rome", "example": "The Fall of Rome"},
                {"name": "Caesar", "example": "Caesar's Last Day"}
            ]}
        ]}]});
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_with(hierarchy)))
            .mount(&server)
            .await;

        let extractor = extractor_for(&server).await;
        let videos = vec![video("The Fall of Rome", 900), video("Caesar's Last Day", 100)];
        let tree = extractor.classify(&videos, "Sleepy History").await.unwrap();

        assert_eq!(tree.series.len(), 1);
        assert_eq!(tree.topic_count(), 2);
        assert_eq!(tree.series[0].total_views, 1000);
    }

    #[tokio::test]
    async fn second_batch_merges_into_running_hierarchy() {
        struct TwoBatchResponder {
            calls: std::sync::atomic::AtomicU32,
        }
        impl Respond for TwoBatchResponder {
            fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
                let body = String::from_utf8_lossy(&request.body);
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    ResponseTemplate::new(200).set_body_json(message_with(json!({
                        "series": [{"name": "S", "themes": [{"name": "T", "topics": [
                            {"name": "one", "example": "Title One"}
                        ]}]}]
                    })))
                } else {
                    // The merge batch must carry the running hierarchy.
                    assert!(body.contains("Title One"), "running hierarchy missing from prompt");
                    ResponseTemplate::new(200).set_body_json(message_with(json!({
                        "series": [{"name": "S", "themes": [{"name": "T", "topics": [
                            {"name": "one", "example": "Title One"},
                            {"name": "two", "example": "Title Two"}
                        ]}]}]
                    })))
                }
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(TwoBatchResponder {
                calls: std::sync::atomic::AtomicU32::new(0),
            })
            .mount(&server)
            .await;

        let extractor = extractor_for(&server).await.with_batch_size(1);
        let videos = vec![video("Title One", 10), video("Title Two", 20)];
        let tree = extractor.classify(&videos, "Channel").await.unwrap();

        // Merge keys topics by concatenation; the duplicate "Title One"
        // row from the second response finds no unconsumed video and is
        // dropped, so coverage stays exact.
        assert_eq!(tree.topic_count(), 2);
        let titles = tree.all_example_titles();
        assert!(titles.contains(&"Title One"));
        assert!(titles.contains(&"Title Two"));
    }

    #[tokio::test]
    async fn failing_batch_falls_back_to_miscellaneous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg", "type": "message", "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "I could not produce JSON"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 10}
            })))
            .mount(&server)
            .await;

        let extractor = extractor_for(&server).await;
        let videos = vec![video("Orphaned Title Here", 10)];
        let tree = extractor.classify(&videos, "Channel").await.unwrap();

        assert_eq!(tree.topic_count(), 1);
        assert_eq!(tree.series[0].name, "Default Series");
        assert_eq!(tree.series[0].themes[0].name, tscout_models::MISC_THEME_NAME);
    }
}
