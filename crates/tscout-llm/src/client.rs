//! The Messages API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::PromptCacheRegistry;
use crate::cost::TokenUsage;
use crate::error::{LlmError, LlmResult};
use crate::parse::extract_json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model for pipeline calls.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model used when a request does not override it
    pub model: String,
    /// Total attempts per call (initial + retries)
    pub max_attempts: u32,
    /// Per-call timeout
    pub timeout: Duration,
    /// In-flight call limit
    pub max_concurrency: usize,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_attempts: 5,
            timeout: Duration::from_secs(120),
            max_concurrency: 5,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| LlmError::config("LLM_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// One part of the user message.
#[derive(Debug, Clone)]
enum UserPart {
    Text { text: String, cached: bool },
    Image { media_type: String, base64_data: String },
}

/// A chat call under construction.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    model: Option<String>,
    system: Vec<(String, bool)>,
    user_parts: Vec<UserPart>,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new() -> Self {
        Self {
            max_tokens: 4096,
            ..Default::default()
        }
    }

    /// Override the configured model for this call.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Append a system block.
    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.system.push((text.into(), false));
        self
    }

    /// Append a system block marked ephemeral for prompt caching.
    pub fn system_cached(mut self, text: impl Into<String>) -> Self {
        self.system.push((text.into(), true));
        self
    }

    /// Append a user text part.
    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.user_parts.push(UserPart::Text {
            text: text.into(),
            cached: false,
        });
        self
    }

    /// Append a user text part marked ephemeral for prompt caching.
    pub fn user_cached(mut self, text: impl Into<String>) -> Self {
        self.user_parts.push(UserPart::Text {
            text: text.into(),
            cached: true,
        });
        self
    }

    /// Append a base64 image part (vision calls).
    pub fn user_image(mut self, media_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        self.user_parts.push(UserPart::Image {
            media_type: media_type.into(),
            base64_data: base64_data.into(),
        });
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn system_text(&self) -> String {
        self.system
            .iter()
            .map(|(text, _)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn static_prefix(&self) -> String {
        self.user_parts
            .iter()
            .filter_map(|part| match part {
                UserPart::Text { text, cached: true } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Refusal,
    StopSequence,
    Other(String),
}

impl StopReason {
    fn from_wire(s: Option<&str>) -> Self {
        match s {
            Some("end_turn") | None => StopReason::EndTurn,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("refusal") => StopReason::Refusal,
            Some("stop_sequence") => StopReason::StopSequence,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }
}

/// A completed chat call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    pub model: String,
    /// Whether the static prefix was already tracked in the process-wide
    /// cache registry before this call.
    pub prefix_was_cached: bool,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    cache_type: &'static str,
}

impl CacheControl {
    fn ephemeral() -> Self {
        Self { cache_type: "ephemeral" }
    }
}

#[derive(Debug, Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Image {
        source: ImageSource,
    },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Messages API client with bounded concurrency.
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    semaphore: Arc<Semaphore>,
    cache: Arc<PromptCacheRegistry>,
}

impl Clone for LlmClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            semaphore: Arc::clone(&self.semaphore),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl LlmClient {
    /// Create a new client.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::config("API key is empty"));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Network)?;
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        Ok(Self {
            http,
            config,
            semaphore,
            cache: Arc::new(PromptCacheRegistry::new()),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    /// The configured default model.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    /// Cache registry statistics.
    pub fn cache_stats(&self) -> crate::cache::PromptCacheStats {
        self.cache.stats()
    }

    /// Free-text call. Retries transient failures with backoff + jitter;
    /// refusals are surfaced immediately and never retried.
    pub async fn call(&self, request: &ChatRequest) -> LlmResult<ChatResponse> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| LlmError::transient("client is shutting down"))?;

        let model = request.model.clone().unwrap_or_else(|| self.config.model.clone());
        let prefix_was_cached =
            self.cache
                .note_use(&model, &request.system_text(), &request.static_prefix());

        let wire = self.build_wire(&model, request);
        let url = format!("{}/v1/messages", self.config.base_url);

        let mut last_error: Option<LlmError> = None;
        for attempt in 0..self.config.max_attempts {
            match self.send_once(&url, &wire).await {
                Ok(response) => {
                    return self.finish(response, prefix_was_cached);
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.config.max_attempts => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "LLM call failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    // Exhausted retries on a retryable error: surface as transient.
                    if e.is_retryable() {
                        return Err(LlmError::transient(e.to_string()));
                    }
                    return Err(e);
                }
            }
        }

        Err(LlmError::transient(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "all attempts failed".to_string()),
        ))
    }

    /// Structured call: parses the response into `T`.
    ///
    /// Repair sequence on malformed output: local extraction (strip
    /// fences, first balanced value), then one full model retry, then
    /// [`LlmError::Parse`] carrying the raw payload.
    pub async fn call_structured<T: DeserializeOwned>(
        &self,
        request: &ChatRequest,
    ) -> LlmResult<(T, ChatResponse)> {
        let response = self.call(request).await?;
        match parse_structured::<T>(&response.text) {
            Ok(value) => Ok((value, response)),
            Err(first_err) => {
                debug!("structured parse failed, retrying once: {}", first_err);
                let retry = self.call(request).await?;
                match parse_structured::<T>(&retry.text) {
                    Ok(value) => Ok((value, retry)),
                    Err(second_err) => Err(LlmError::parse(
                        format!("{first_err}; retry: {second_err}"),
                        retry.text,
                    )),
                }
            }
        }
    }

    fn build_wire(&self, model: &str, request: &ChatRequest) -> MessagesRequest {
        let system = request
            .system
            .iter()
            .map(|(text, cached)| SystemBlock {
                block_type: "text",
                text: text.clone(),
                cache_control: cached.then(CacheControl::ephemeral),
            })
            .collect();

        let content = request
            .user_parts
            .iter()
            .map(|part| match part {
                UserPart::Text { text, cached } => ContentBlock::Text {
                    text: text.clone(),
                    cache_control: cached.then(CacheControl::ephemeral),
                },
                UserPart::Image { media_type, base64_data } => ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: media_type.clone(),
                        data: base64_data.clone(),
                    },
                },
            })
            .collect();

        MessagesRequest {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            system,
            messages: vec![WireMessage {
                role: "user",
                content,
            }],
            temperature: request.temperature,
        }
    }

    async fn send_once(&self, url: &str, wire: &MessagesRequest) -> LlmResult<MessagesResponse> {
        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(wire)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| format!("{}: {}", e.error.error_type, e.error.message))
            .unwrap_or(body);

        // 429 and 5xx are retryable via LlmError::is_retryable.
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn finish(&self, response: MessagesResponse, prefix_was_cached: bool) -> LlmResult<ChatResponse> {
        let text: String = response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Unknown => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = StopReason::from_wire(response.stop_reason.as_deref());
        if stop_reason == StopReason::Refusal {
            return Err(LlmError::Refusal(text));
        }

        Ok(ChatResponse {
            text,
            stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                cache_creation_input_tokens: response.usage.cache_creation_input_tokens,
                cache_read_input_tokens: response.usage.cache_read_input_tokens,
            },
            model: response.model,
            prefix_was_cached,
        })
    }
}

fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Ok(value);
    }
    let repaired = extract_json(text).ok_or_else(|| "no JSON value found in output".to_string())?;
    serde_json::from_str::<T>(repaired).map_err(|e| e.to_string())
}

/// Exponential backoff with full jitter, capped at 10 seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms: u64 = 500;
    let capped = base_ms.saturating_mul(2u64.pow(attempt)).min(10_000);

    // Time-based pseudo-randomization keeps the dependency set small.
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let jitter = (capped as f64 * (nanos % 1000) as f64 / 1000.0) as u64;

    Duration::from_millis(jitter.max(base_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    fn ok_body(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 100, "output_tokens": 20, "cache_read_input_tokens": 40}
        })
    }

    async fn client_for(server: &MockServer) -> LlmClient {
        let mut config = LlmConfig::new("test-key").with_base_url(server.uri());
        config.max_attempts = 3;
        LlmClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn call_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("hello")))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client
            .call(&ChatRequest::new().system("be brief").user("hi"))
            .await
            .unwrap();

        assert_eq!(response.text, "hello");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 100);
        assert_eq!(response.usage.cache_read_input_tokens, 40);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        struct FlakyResponder {
            calls: std::sync::atomic::AtomicU32,
        }
        impl Respond for FlakyResponder {
            fn respond(&self, _: &wiremock::Request) -> ResponseTemplate {
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    ResponseTemplate::new(529).set_body_string("overloaded")
                } else {
                    ResponseTemplate::new(200).set_body_json(ok_body("recovered"))
                }
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(FlakyResponder {
                calls: std::sync::atomic::AtomicU32::new(0),
            })
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client.call(&ChatRequest::new().user("hi")).await.unwrap();
        assert_eq!(response.text, "recovered");
    }

    #[tokio::test]
    async fn refusal_is_not_retried() {
        let server = MockServer::start().await;
        let body = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "I can't help with that."}],
            "stop_reason": "refusal",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.call(&ChatRequest::new().user("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::Refusal(_)));
    }

    #[tokio::test]
    async fn structured_call_strips_code_fences() {
        #[derive(Deserialize)]
        struct Out {
            value: u32,
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("```json\n{\"value\": 7}\n```")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let (out, _) = client
            .call_structured::<Out>(&ChatRequest::new().user("hi"))
            .await
            .unwrap();
        assert_eq!(out.value, 7);
    }

    #[tokio::test]
    async fn structured_parse_failure_surfaces_raw_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("not json at all")))
            .expect(2) // one full model retry after local repair fails
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .call_structured::<serde_json::Value>(&ChatRequest::new().user("hi"))
            .await
            .unwrap_err();
        match err {
            LlmError::Parse { raw, .. } => assert_eq!(raw, "not json at all"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
