//! Parallel per-segment script generation.

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

use tscout_llm::{ChatRequest, CostReport, LlmClient};
use tscout_models::{FullScript, PlotOutline, ScriptSegment};

use crate::error::{ScriptError, ScriptResult};
use crate::outline::render_outline;
use crate::postprocess::{clean_segment, segment_is_well_formed};
use crate::prompts;

/// Target words per minute of runtime.
pub const WORDS_PER_MINUTE: usize = 170;

/// Floor words per minute of runtime.
pub const MIN_WORDS_PER_MINUTE: usize = 160;

/// Segments whose floor exceeds this are generated in chunks.
const CHUNK_THRESHOLD_WORDS: usize = 1600;

/// Word budget per chunk used to size the chunk count.
const CHUNK_BUDGET_WORDS: usize = 2000;

/// Concurrent segment generations per script.
const SEGMENT_CONCURRENCY: usize = 5;

/// Attempts per chunk.
const CHUNK_RETRIES: u32 = 3;

/// Attempts per single-chunk segment.
const SEGMENT_RETRIES: u32 = 5;

/// Word budget for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub target_words: usize,
    pub min_words: usize,
    pub chunk_count: usize,
    /// Per-chunk word target when chunked.
    pub chunk_words: usize,
}

/// Compute the word budget and chunking for a segment duration.
pub fn chunk_plan(duration_sec: u64) -> ChunkPlan {
    let minutes = duration_sec as f64 / 60.0;
    let target_words = (minutes * WORDS_PER_MINUTE as f64).round() as usize;
    let min_words = (minutes * MIN_WORDS_PER_MINUTE as f64).round() as usize;

    let chunk_count = if min_words > CHUNK_THRESHOLD_WORDS {
        min_words.div_ceil(CHUNK_BUDGET_WORDS)
    } else {
        1
    };

    ChunkPlan {
        target_words,
        min_words,
        chunk_count,
        chunk_words: min_words.div_ceil(chunk_count.max(1)),
    }
}

/// Everything needed to render one full script.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub title: String,
    pub series_name: String,
    pub theme_name: String,
    pub outline: PlotOutline,
    pub breakdown: String,
    pub characters: Vec<String>,
    pub host_name: String,
    pub sponsored: Option<String>,
}

/// A generated script plus its accounting.
#[derive(Debug)]
pub struct ScriptOutput {
    pub script: FullScript,
    pub cost: CostReport,
    /// One message per segment that fell back to a placeholder.
    pub segment_errors: Vec<String>,
}

/// Parallel per-segment generator with chunking and prompt caching.
pub struct FullScriptGenerator {
    llm: LlmClient,
}

impl FullScriptGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Generate the full script for `request`.
    ///
    /// Segments run concurrently (at most [`SEGMENT_CONCURRENCY`] in
    /// flight) and are reassembled in outline order. A segment whose
    /// retries are exhausted yields a single placeholder line instead of
    /// failing the script.
    pub async fn full_script(&self, request: &ScriptRequest) -> ScriptResult<ScriptOutput> {
        if request.outline.segments.is_empty() {
            return Err(ScriptError::validation("outline has no segments"));
        }
        request.outline.validate()?;

        let guidelines = prompts::segment_guidelines(&request.host_name);
        let context = prompts::segment_context(
            &request.title,
            &render_outline(&request.outline),
            &request.breakdown,
            &request.characters,
            &request.host_name,
            request.sponsored.as_deref(),
        );

        let mut results: Vec<(usize, SegmentResult)> =
            stream::iter(request.outline.segments.iter().enumerate())
                .map(|(index, segment)| {
                    let guidelines = &guidelines;
                    let context = &context;
                    async move {
                        let result = self
                            .generate_segment(guidelines, context, &request.host_name, index, segment)
                            .await;
                        (index, result)
                    }
                })
                .buffer_unordered(SEGMENT_CONCURRENCY)
                .collect()
                .await;

        // Reassemble in original outline order.
        results.sort_by_key(|(index, _)| *index);

        let mut cost = CostReport::default();
        let mut segments = Vec::with_capacity(results.len());
        let mut segment_errors = Vec::new();

        for (index, result) in results {
            cost.merge(result.cost);
            if let Some(message) = result.error {
                error!(segment = index, "segment fell back to placeholder: {message}");
                segment_errors.push(format!("segment {index}: {message}"));
            }
            segments.push(result.segment);
        }

        info!(
            title = %request.title,
            segments = segments.len(),
            placeholders = segment_errors.len(),
            cost = cost.total_cost,
            "generated full script"
        );

        Ok(ScriptOutput {
            script: FullScript {
                title: request.title.clone(),
                series_name: request.series_name.clone(),
                theme_name: request.theme_name.clone(),
                segments,
                generated_at: Utc::now(),
            },
            cost,
            segment_errors,
        })
    }

    async fn generate_segment(
        &self,
        guidelines: &str,
        context: &str,
        host_name: &str,
        index: usize,
        segment: &tscout_models::OutlineSegment,
    ) -> SegmentResult {
        let plan = chunk_plan(segment.duration_sec);
        let header = ScriptSegment::format_header(
            &segment.name,
            segment.start,
            segment.end,
            segment.duration_sec,
        );

        let mut cost = CostReport::default();

        let body = if plan.chunk_count == 1 {
            self.generate_single(
                guidelines, context, host_name, index, segment, &header, plan.target_words, &mut cost,
            )
            .await
        } else {
            self.generate_chunked(
                guidelines, context, host_name, index, segment, &header, &plan, &mut cost,
            )
            .await
        };

        match body {
            Ok(body) => SegmentResult {
                segment: ScriptSegment {
                    index,
                    name: segment.name.clone(),
                    header,
                    body,
                },
                cost,
                error: None,
            },
            Err(message) => SegmentResult {
                segment: ScriptSegment {
                    index,
                    name: segment.name.clone(),
                    header,
                    body: format!("[{host_name}]: Error generating content for this segment."),
                },
                cost,
                error: Some(message),
            },
        }
    }

    /// One-shot segment with retries.
    #[allow(clippy::too_many_arguments)]
    async fn generate_single(
        &self,
        guidelines: &str,
        context: &str,
        host_name: &str,
        index: usize,
        segment: &tscout_models::OutlineSegment,
        header: &str,
        target_words: usize,
        cost: &mut CostReport,
    ) -> Result<String, String> {
        let task = prompts::segment_task(header, &segment.key_points, target_words, None);
        let mut last_error = String::from("no attempts made");

        for attempt in 0..SEGMENT_RETRIES {
            match self
                .call_segment(guidelines, context, &task, index, None, cost)
                .await
            {
                Ok(raw) => {
                    let cleaned = clean_segment(&raw, header, host_name);
                    if segment_is_well_formed(&cleaned, header) {
                        return Ok(body_of(&cleaned));
                    }
                    last_error = "output failed shape validation".to_string();
                    warn!(segment = index, attempt = attempt + 1, "{last_error}");
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(segment = index, attempt = attempt + 1, "segment call failed: {last_error}");
                }
            }
        }

        Err(last_error)
    }

    /// Long segment generated as several chunks under one header.
    #[allow(clippy::too_many_arguments)]
    async fn generate_chunked(
        &self,
        guidelines: &str,
        context: &str,
        host_name: &str,
        index: usize,
        segment: &tscout_models::OutlineSegment,
        header: &str,
        plan: &ChunkPlan,
        cost: &mut CostReport,
    ) -> Result<String, String> {
        let mut bodies: Vec<String> = Vec::with_capacity(plan.chunk_count);

        for chunk_index in 0..plan.chunk_count {
            let task = prompts::segment_task(
                header,
                &segment.key_points,
                plan.chunk_words,
                Some((chunk_index, plan.chunk_count)),
            );

            let mut chunk_body: Option<String> = None;
            let mut last_error = String::new();

            for attempt in 0..CHUNK_RETRIES {
                match self
                    .call_segment(guidelines, context, &task, index, Some(chunk_index), cost)
                    .await
                {
                    Ok(raw) => {
                        let cleaned = clean_segment(&raw, header, host_name);
                        if segment_is_well_formed(&cleaned, header) {
                            chunk_body = Some(body_of(&cleaned));
                            break;
                        }
                        last_error = "output failed shape validation".to_string();
                        warn!(segment = index, chunk = chunk_index, attempt = attempt + 1, "{last_error}");
                    }
                    Err(e) => {
                        last_error = e.to_string();
                        warn!(
                            segment = index,
                            chunk = chunk_index,
                            attempt = attempt + 1,
                            "chunk call failed: {last_error}"
                        );
                    }
                }
            }

            match chunk_body {
                Some(body) => bodies.push(body),
                None => {
                    return Err(format!(
                        "chunk {} of {} failed: {last_error}",
                        chunk_index + 1,
                        plan.chunk_count
                    ))
                }
            }
        }

        Ok(bodies.join("\n\n"))
    }

    async fn call_segment(
        &self,
        guidelines: &str,
        context: &str,
        task: &str,
        index: usize,
        chunk: Option<usize>,
        cost: &mut CostReport,
    ) -> tscout_llm::LlmResult<String> {
        let request = ChatRequest::new()
            .system_cached(guidelines.to_string())
            .user_cached(context.to_string())
            .user(task.to_string())
            .max_tokens(8192)
            .temperature(0.7);

        let response = self.llm.call(&request).await?;
        let label = match chunk {
            Some(chunk) => format!("segment-{index}-chunk-{chunk}"),
            None => format!("segment-{index}"),
        };
        cost.record(&response.model, label, response.usage);
        Ok(response.text)
    }
}

struct SegmentResult {
    segment: ScriptSegment,
    cost: CostReport,
    error: Option<String>,
}

/// Everything after the header line.
fn body_of(cleaned: &str) -> String {
    cleaned.splitn(2, '\n').nth(1).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_llm::LlmConfig;
    use tscout_models::{OutlineSegment, Timecode};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    #[test]
    fn chunk_plan_for_short_segments() {
        // 9 minutes: 1440 floor words, single chunk.
        let plan = chunk_plan(9 * 60);
        assert_eq!(plan.target_words, 1530);
        assert_eq!(plan.min_words, 1440);
        assert_eq!(plan.chunk_count, 1);
    }

    #[test]
    fn chunk_plan_for_a_45_minute_segment() {
        // 45 minutes: floor 7200 words → 4 chunks of 1800.
        let plan = chunk_plan(45 * 60);
        assert_eq!(plan.min_words, 7200);
        assert_eq!(plan.chunk_count, 4);
        assert_eq!(plan.chunk_words, 1800);
    }

    #[test]
    fn chunk_plan_boundary() {
        // Exactly 10 minutes: 1600 floor words, still one chunk.
        let plan = chunk_plan(600);
        assert_eq!(plan.min_words, 1600);
        assert_eq!(plan.chunk_count, 1);
    }

    fn outline() -> PlotOutline {
        PlotOutline {
            title: "The Fall of Carthage".to_string(),
            total_duration_sec: 620,
            segments: vec![
                OutlineSegment {
                    name: "A City Doomed to Burn".to_string(),
                    start: Timecode(0),
                    end: Timecode(20),
                    duration_sec: 20,
                    key_points: vec!["cold open".to_string()],
                },
                OutlineSegment {
                    name: "Rome's Final Ultimatum".to_string(),
                    start: Timecode(20),
                    end: Timecode(620),
                    duration_sec: 600,
                    key_points: vec!["the demand".to_string()],
                },
            ],
        }
    }

    fn request() -> ScriptRequest {
        ScriptRequest {
            title: "The Fall of Carthage".to_string(),
            series_name: "History for Sleep".to_string(),
            theme_name: "Rome".to_string(),
            outline: outline(),
            breakdown: "WRITING STYLE ANALYSIS: calm, slow.".to_string(),
            characters: vec![],
            host_name: "Marcus".to_string(),
            sponsored: None,
        }
    }

    /// Replies with a valid segment for whichever header the request
    /// asked for.
    struct EchoHeaderResponder;
    impl Respond for EchoHeaderResponder {
        fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
            let body = String::from_utf8_lossy(&request.body);
            let header = if body.contains("A City Doomed to Burn") {
                "A City Doomed to Burn (00:00:00 - 00:00:20, Duration: 00:00:20)"
            } else {
                "Rome's Final Ultimatum (00:00:20 - 00:10:20, Duration: 00:10:00)"
            };
            let text = format!("{header}\n[Marcus]: The story begins here tonight.");
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg", "type": "message", "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": text}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 1000, "output_tokens": 400, "cache_read_input_tokens": 600}
            }))
        }
    }

    #[tokio::test]
    async fn segments_reassemble_in_order_with_breaks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(EchoHeaderResponder)
            .mount(&server)
            .await;

        let generator = FullScriptGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let output = generator.full_script(&request()).await.unwrap();

        assert_eq!(output.script.segments.len(), 2);
        assert!(output.segment_errors.is_empty());

        let rendered = output.script.render();
        let first = rendered.find("A City Doomed to Burn").unwrap();
        let second = rendered.find("Rome's Final Ultimatum").unwrap();
        assert!(first < second);
        assert_eq!(rendered.matches(tscout_models::SEGMENT_BREAK).count(), 1);

        // Script shape: every non-header, non-blank line is dialogue.
        for segment in &output.script.segments {
            for line in segment.body.lines() {
                assert!(
                    line.trim().is_empty() || tscout_models::is_dialogue_line(line),
                    "bad line: {line}"
                );
            }
        }

        // Token accounting: totals equal the segment sum.
        let sum: f64 = output.cost.segments.iter().map(|s| s.cost).sum();
        assert!((output.cost.total_cost - sum).abs() < 1e-9);
        assert_eq!(output.cost.segments.len(), 2);
        assert_eq!(output.cost.usage.cache_read_input_tokens, 1200);
    }

    #[tokio::test]
    async fn irrecoverable_segment_becomes_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let generator = FullScriptGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let output = generator.full_script(&request()).await.unwrap();

        assert_eq!(output.segment_errors.len(), 2);
        for segment in &output.script.segments {
            assert_eq!(
                segment.body,
                "[Marcus]: Error generating content for this segment."
            );
            assert!(tscout_models::is_dialogue_line(&segment.body));
        }
    }

    #[tokio::test]
    async fn empty_outline_is_rejected() {
        let server = MockServer::start().await;
        let generator = FullScriptGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let mut bad = request();
        bad.outline.segments.clear();
        assert!(matches!(
            generator.full_script(&bad).await,
            Err(ScriptError::Validation(_))
        ));
    }
}
