//! Versioned-prediction image model client.
//!
//! Speaks the Replicate-style API: create a prediction against a trained
//! model version, poll until it settles, collect output URLs. Fine-tune
//! training follows the same create-and-poll shape with a much longer
//! deadline.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tscout_models::{guidance_scale_for_style, ThumbnailGuidelines};

use crate::error::{ThumbnailError, ThumbnailResult};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ImageModelConfig {
    pub api_key: String,
    pub base_url: String,
    /// Poll interval for predictions.
    pub poll_interval: Duration,
    /// Deadline for a render prediction.
    pub prediction_deadline: Duration,
    /// Deadline for fine-tune training.
    pub training_deadline: Duration,
}

impl ImageModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.replicate.com".to_string(),
            poll_interval: Duration::from_secs(5),
            prediction_deadline: Duration::from_secs(300),
            training_deadline: Duration::from_secs(3600),
        }
    }

    /// Create config from the `IMAGE_MODEL_API_KEY` environment variable.
    pub fn from_env() -> ThumbnailResult<Self> {
        let api_key = std::env::var("IMAGE_MODEL_API_KEY")
            .map_err(|_| ThumbnailError::config("IMAGE_MODEL_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[derive(Debug, Serialize)]
struct PredictionRequest {
    version: String,
    input: PredictionInput,
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    prompt: String,
    guidance_scale: f64,
    num_outputs: u32,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    /// Trained version id, present on finished trainings.
    #[serde(default)]
    version: Option<String>,
}

/// Outcome of a finished fine-tune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingOutcome {
    pub version: String,
    pub trigger_word: String,
}

/// Image model client.
pub struct ImageModelClient {
    http: Client,
    config: ImageModelConfig,
}

impl ImageModelClient {
    pub fn new(config: ImageModelConfig) -> ThumbnailResult<Self> {
        if config.api_key.is_empty() {
            return Err(ThumbnailError::config("API key is empty"));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ThumbnailError::Network)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ThumbnailResult<Self> {
        Self::new(ImageModelConfig::from_env()?)
    }

    /// Render thumbnails for one concept against a trained model.
    ///
    /// The prompt is `trigger_word + concept + style-preserving suffix`;
    /// the guidance scale comes from the guideline style classification.
    pub async fn generate(
        &self,
        trained_model_version: &str,
        trigger_word: &str,
        concept: &str,
        guidelines: &ThumbnailGuidelines,
        num_outputs: u32,
    ) -> ThumbnailResult<Vec<String>> {
        let prompt = build_prompt(trigger_word, concept, guidelines);
        debug!(prompt, "rendering thumbnail concept");

        let request = PredictionRequest {
            version: trained_model_version.to_string(),
            input: PredictionInput {
                prompt,
                guidance_scale: guidance_scale_for_style(&guidelines.style_classification),
                num_outputs,
            },
        };

        let prediction: PredictionResponse = self
            .post_json("/v1/predictions", &request)
            .await?;

        let settled = self
            .poll_until_settled(&prediction.id, self.config.prediction_deadline)
            .await?;

        let urls = output_urls(settled.output.as_ref());
        info!(concept, outputs = urls.len(), "thumbnail prediction finished");
        Ok(urls)
    }

    /// Start a fine-tune and wait for it to finish. Polls with the
    /// configured interval up to the training deadline (default 1 hour).
    pub async fn train(
        &self,
        base_version: &str,
        training_images_url: &str,
        trigger_word: &str,
    ) -> ThumbnailResult<TrainingOutcome> {
        let request = serde_json::json!({
            "version": base_version,
            "input": {
                "input_images": training_images_url,
                "trigger_word": trigger_word,
            }
        });

        let training: PredictionResponse = self.post_json("/v1/trainings", &request).await?;
        let settled = self
            .poll_until_settled(&training.id, self.config.training_deadline)
            .await?;

        let version = settled
            .version
            .ok_or_else(|| ThumbnailError::Training("finished training has no version".to_string()))?;

        info!(version, trigger_word, "fine-tune training finished");
        Ok(TrainingOutcome {
            version,
            trigger_word: trigger_word.to_string(),
        })
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ThumbnailResult<PredictionResponse> {
        let response = self
            .http
            .post(format!("{}{}", self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ThumbnailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn poll_until_settled(
        &self,
        id: &str,
        deadline: Duration,
    ) -> ThumbnailResult<PredictionResponse> {
        let started = tokio::time::Instant::now();

        loop {
            let response = self
                .http
                .get(format!("{}/v1/predictions/{id}", self.config.base_url))
                .bearer_auth(&self.config.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ThumbnailError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let prediction: PredictionResponse = response.json().await?;
            match prediction.status.as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    return Err(ThumbnailError::Training(
                        prediction.error.unwrap_or_else(|| prediction.status.clone()),
                    ))
                }
                _ => {
                    if started.elapsed() >= deadline {
                        return Err(ThumbnailError::Timeout(deadline.as_secs()));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }
}

/// `trigger_word + concept + style-preserving suffix`.
fn build_prompt(trigger_word: &str, concept: &str, guidelines: &ThumbnailGuidelines) -> String {
    let suffix = guidelines.training_guidance.prompt_suffix.trim();
    if suffix.is_empty() {
        format!("{trigger_word} {concept}")
    } else {
        format!("{trigger_word} {concept}, {suffix}")
    }
}

fn output_urls(output: Option<&serde_json::Value>) -> Vec<String> {
    match output {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Some(serde_json::Value::String(url)) => vec![url.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_models::TrainingGuidance;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    fn guidelines() -> ThumbnailGuidelines {
        ThumbnailGuidelines {
            layout_zones: serde_json::Value::Null,
            typography: serde_json::Value::Null,
            overlays: serde_json::Value::Null,
            series_constants: serde_json::Value::Null,
            style_classification: "photorealistic".to_string(),
            training_guidance: TrainingGuidance {
                prompt_prefix: String::new(),
                prompt_suffix: "muted colors, heavy serif title".to_string(),
            },
        }
    }

    #[test]
    fn prompt_combines_trigger_concept_and_suffix() {
        let prompt = build_prompt("SLEEPYHIST", "burning harbor at dusk", &guidelines());
        assert_eq!(
            prompt,
            "SLEEPYHIST burning harbor at dusk, muted colors, heavy serif title"
        );
    }

    #[tokio::test]
    async fn generate_polls_until_success() {
        struct PollResponder {
            calls: std::sync::atomic::AtomicU32,
        }
        impl Respond for PollResponder {
            fn respond(&self, _: &wiremock::Request) -> ResponseTemplate {
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"id": "p1", "status": "processing"}))
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "id": "p1",
                        "status": "succeeded",
                        "output": ["https://img/1.png", "https://img/2.png"]
                    }))
                }
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "p1", "status": "starting"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(PollResponder {
                calls: std::sync::atomic::AtomicU32::new(0),
            })
            .mount(&server)
            .await;

        let client = ImageModelClient::new(
            ImageModelConfig::new("k")
                .with_base_url(server.uri())
                .with_poll_interval(Duration::from_millis(5)),
        )
        .unwrap();

        let urls = client
            .generate("version-1", "SLEEPYHIST", "burning harbor", &guidelines(), 2)
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn failed_training_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/trainings"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "t1", "status": "starting"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "t1", "status": "failed", "error": "bad training data"
            })))
            .mount(&server)
            .await;

        let client = ImageModelClient::new(
            ImageModelConfig::new("k")
                .with_base_url(server.uri())
                .with_poll_interval(Duration::from_millis(5)),
        )
        .unwrap();

        let err = client
            .train("base-version", "https://zip", "SLEEPYHIST")
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Training(_)));
    }
}
