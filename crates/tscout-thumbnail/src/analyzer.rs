//! Vision analysis of reference thumbnails.

use base64::Engine;
use serde::Deserialize;
use tracing::info;

use tscout_llm::{ChatRequest, LlmClient};
use tscout_models::{ThumbnailGuidelines, TrainingGuidance};

use crate::error::{ThumbnailError, ThumbnailResult};

/// One reference thumbnail to analyze.
pub struct ReferenceImage {
    /// e.g. `image/jpeg`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct GuidelinesWire {
    #[serde(default)]
    layout_zones: serde_json::Value,
    #[serde(default)]
    typography: serde_json::Value,
    #[serde(default)]
    overlays: serde_json::Value,
    #[serde(default)]
    series_constants: serde_json::Value,
    #[serde(default)]
    style_classification: String,
    #[serde(default)]
    training_guidance: TrainingGuidanceWire,
}

#[derive(Debug, Deserialize, Default)]
struct TrainingGuidanceWire {
    #[serde(default)]
    prompt_prefix: String,
    #[serde(default)]
    prompt_suffix: String,
}

const ANALYSIS_SYSTEM: &str = r#"You are a thumbnail art director. You study reference thumbnails from one YouTube series and extract the visual system that makes them recognizable.

Return ONLY a JSON object with exactly this schema:
{
  "layout_zones": {"<zone name>": "<what occupies it>"},
  "typography": {"case": "...", "weight": "...", "stroke": "...", "placement": "..."},
  "overlays": {"<overlay name>": "<description>"},
  "series_constants": {"<constant>": "<description>"},
  "style_classification": "photorealistic | illustration | cartoon | graphic",
  "training_guidance": {
    "prompt_prefix": "<text to prepend to every image prompt>",
    "prompt_suffix": "<text to append to every image prompt to preserve the series style>"
  }
}

The TRAINING_GUIDANCE block is used verbatim as prompt prefix/suffix for a fine-tuned image model, so write it as image-prompt language, not prose."#;

/// Produces [`ThumbnailGuidelines`] from reference thumbnails.
pub struct ThumbnailAnalyzer {
    llm: LlmClient,
}

impl ThumbnailAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Analyze a set of reference thumbnails into the guideline document.
    pub async fn analyze_references(
        &self,
        series_name: &str,
        references: &[ReferenceImage],
    ) -> ThumbnailResult<ThumbnailGuidelines> {
        if references.is_empty() {
            return Err(ThumbnailError::validation("no reference thumbnails"));
        }

        let mut request = ChatRequest::new()
            .system(ANALYSIS_SYSTEM)
            .max_tokens(4096)
            .temperature(0.2);

        for reference in references {
            request = request.user_image(
                reference.media_type.clone(),
                base64::engine::general_purpose::STANDARD.encode(&reference.bytes),
            );
        }
        request = request.user(format!(
            "These are {} reference thumbnails from the series \"{series_name}\". Extract the guideline document.",
            references.len()
        ));

        let (wire, _) = self.llm.call_structured::<GuidelinesWire>(&request).await?;

        info!(
            series = series_name,
            references = references.len(),
            style = %wire.style_classification,
            "analyzed reference thumbnails"
        );

        Ok(ThumbnailGuidelines {
            layout_zones: wire.layout_zones,
            typography: wire.typography,
            overlays: wire.overlays,
            series_constants: wire.series_constants,
            style_classification: wire.style_classification,
            training_guidance: TrainingGuidance {
                prompt_prefix: wire.training_guidance.prompt_prefix,
                prompt_suffix: wire.training_guidance.prompt_suffix,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_llm::LlmConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn analyzes_references_into_guidelines() {
        let server = MockServer::start().await;
        let guidelines = json!({
            "layout_zones": {"left_third": "subject portrait"},
            "typography": {"case": "upper", "weight": "heavy", "stroke": "black", "placement": "right"},
            "overlays": {"vignette": "dark edges"},
            "series_constants": {"border": "red frame"},
            "style_classification": "graphic",
            "training_guidance": {"prompt_prefix": "YT thumbnail,", "prompt_suffix": "bold red frame, heavy type"}
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            // The vision call must carry base64 image blocks.
            .and(body_string_contains("\"type\":\"image\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg", "type": "message", "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": guidelines.to_string()}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 2000, "output_tokens": 300}
            })))
            .mount(&server)
            .await;

        let analyzer = ThumbnailAnalyzer::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let references = vec![ReferenceImage {
            media_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }];

        let result = analyzer
            .analyze_references("History for Sleep", &references)
            .await
            .unwrap();
        assert_eq!(result.style_classification, "graphic");
        assert_eq!(result.training_guidance.prompt_suffix, "bold red frame, heavy type");
        assert_eq!(tscout_models::guidance_scale_for_style(&result.style_classification), 4.5);
    }

    #[tokio::test]
    async fn empty_references_are_rejected() {
        let server = MockServer::start().await;
        let analyzer = ThumbnailAnalyzer::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        assert!(matches!(
            analyzer.analyze_references("S", &[]).await,
            Err(ThumbnailError::Validation(_))
        ));
    }
}
