//! Per-theme content resources and the canonical storage key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outline::PlotOutline;
use crate::script::{FullScript, ScriptBreakdown};
use crate::thumbnail::ThumbnailAssets;

/// Derive the canonical storage key for a (series, theme) pair.
///
/// Dots and spaces are replaced with underscores so the pair can address a
/// nested document field. This is the only place the derivation lives; API
/// responses always carry the display names, never this key.
pub fn resource_key(series_name: &str, theme_name: &str) -> String {
    format!("{}::{}", sanitize(series_name), sanitize(theme_name))
}

fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '.' || c == ' ' { '_' } else { c })
        .collect()
}

/// Generated content for one (series, theme) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ThemeResources {
    pub series_name: String,
    pub theme_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_breakdown: Option<ScriptBreakdown>,
    #[serde(default)]
    pub plot_outlines: Vec<PlotOutline>,
    #[serde(default)]
    pub full_scripts: Vec<FullScript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailAssets>,
}

impl ThemeResources {
    pub fn new(series_name: impl Into<String>, theme_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
            theme_name: theme_name.into(),
            ..Default::default()
        }
    }

    /// Readiness summary for the resource-check endpoint.
    pub fn status(&self) -> ResourceStatus {
        let has_script_breakdown = self.script_breakdown.is_some();
        let has_thumbnail_model = self
            .thumbnail
            .as_ref()
            .map(|t| t.has_trained_model())
            .unwrap_or(false);
        ResourceStatus {
            has_script_breakdown,
            has_thumbnail_model,
            has_resources: has_script_breakdown && has_thumbnail_model,
        }
    }
}

/// Whether a theme is ready for content generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ResourceStatus {
    pub has_script_breakdown: bool,
    pub has_thumbnail_model: bool,
    pub has_resources: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_key_replaces_dots_and_spaces() {
        assert_eq!(
            resource_key("Greek Myths 2.0", "Sleep Stories"),
            "Greek_Myths_2_0::Sleep_Stories"
        );
    }

    #[test]
    fn resource_key_is_stable() {
        assert_eq!(
            resource_key("A B", "C.D"),
            resource_key("A B", "C.D")
        );
    }

    #[test]
    fn status_requires_breakdown_and_trained_model() {
        let mut resources = ThemeResources::new("S", "T");
        assert!(!resources.status().has_resources);

        resources.script_breakdown = Some(ScriptBreakdown {
            project_id: crate::ids::ProjectId::new(),
            series_name: "S".to_string(),
            theme_name: "T".to_string(),
            is_clip_reactive: false,
            script_breakdown: "…".to_string(),
            created_at: chrono::Utc::now(),
        });
        let status = resources.status();
        assert!(status.has_script_breakdown);
        assert!(!status.has_resources);
    }
}
