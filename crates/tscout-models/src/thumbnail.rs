//! Thumbnail guidelines and generated assets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Prompt prefix/suffix wrapped around concepts when invoking the
/// fine-tuned image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct TrainingGuidance {
    pub prompt_prefix: String,
    pub prompt_suffix: String,
}

/// Fixed-schema guideline document produced by the vision analysis pass
/// over a series' reference thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailGuidelines {
    /// Named layout zones and what occupies them
    #[serde(default)]
    pub layout_zones: serde_json::Value,
    /// Font treatment: case, weight, stroke, placement
    #[serde(default)]
    pub typography: serde_json::Value,
    /// Recurring overlays (borders, vignettes, badges)
    #[serde(default)]
    pub overlays: serde_json::Value,
    /// Constants that identify the series across thumbnails
    #[serde(default)]
    pub series_constants: serde_json::Value,
    /// Style classification, e.g. `photorealistic`, `illustration`
    #[serde(default)]
    pub style_classification: String,
    #[serde(default)]
    pub training_guidance: TrainingGuidance,
}

/// Map a style classification onto an image-model guidance scale.
pub fn guidance_scale_for_style(style: &str) -> f64 {
    match style.trim().to_ascii_lowercase().as_str() {
        "photorealistic" => 2.5,
        "illustration" => 3.5,
        "cartoon" => 4.0,
        "graphic" => 4.5,
        _ => 3.0,
    }
}

/// Everything the thumbnail pipeline has produced for one theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ThumbnailAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<ThumbnailGuidelines>,
    /// Version id of the fine-tuned image model, once training finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_model_version: Option<String>,
    /// Token that invokes the fine-tuned model's visual identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_word: Option<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub rendered_urls: Vec<String>,
}

impl ThumbnailAssets {
    /// A model is usable once both a trained version and guidelines exist.
    pub fn has_trained_model(&self) -> bool {
        self.trained_model_version.is_some() && self.guidelines.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_scale_table() {
        assert_eq!(guidance_scale_for_style("photorealistic"), 2.5);
        assert_eq!(guidance_scale_for_style("Illustration"), 3.5);
        assert_eq!(guidance_scale_for_style("cartoon"), 4.0);
        assert_eq!(guidance_scale_for_style("graphic"), 4.5);
        assert_eq!(guidance_scale_for_style("watercolor"), 3.0);
    }

    #[test]
    fn trained_model_needs_guidelines_and_version() {
        let mut assets = ThumbnailAssets {
            trained_model_version: Some("v1".to_string()),
            ..Default::default()
        };
        assert!(!assets.has_trained_model());

        assets.guidelines = Some(ThumbnailGuidelines {
            layout_zones: serde_json::Value::Null,
            typography: serde_json::Value::Null,
            overlays: serde_json::Value::Null,
            series_constants: serde_json::Value::Null,
            style_classification: "graphic".to_string(),
            training_guidance: TrainingGuidance::default(),
        });
        assert!(assets.has_trained_model());
    }
}
