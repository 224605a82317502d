//! Shared-series detection.
//!
//! A candidate channel shares a series when at least three of its recent
//! titles match the series' example titles. The LLM does the matching;
//! substring matching covers LLM failures.

use serde::Deserialize;
use tracing::warn;

use tscout_llm::{ChatRequest, LlmClient};
use tscout_models::{MatchingSeries, TaxonomyTree};

use crate::error::DiscoveryResult;

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    matching_titles: Vec<String>,
}

/// LLM-backed shared-series matcher with a deterministic fallback.
pub struct SharedSeriesDetector {
    llm: LlmClient,
}

impl SharedSeriesDetector {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Check every series of `taxonomy` against a candidate's recent
    /// titles. Only series clearing the three-title threshold are
    /// returned.
    pub async fn check_shared(
        &self,
        taxonomy: &TaxonomyTree,
        candidate_titles: &[String],
    ) -> DiscoveryResult<Vec<MatchingSeries>> {
        let mut matches = Vec::new();

        for series in &taxonomy.series {
            let examples = series.example_titles();
            if examples.is_empty() {
                continue;
            }

            let matching_titles = match self.match_titles(&series.name, &examples, candidate_titles).await {
                Ok(titles) => titles,
                Err(e) => {
                    warn!(
                        series = %series.name,
                        "LLM series matching failed, using substring fallback: {e}"
                    );
                    substring_match(&examples, candidate_titles)
                }
            };

            let candidate = MatchingSeries {
                series_name: series.name.clone(),
                matching_titles,
            };
            if candidate.is_eligible() {
                matches.push(candidate);
            }
        }

        Ok(matches)
    }

    async fn match_titles(
        &self,
        series_name: &str,
        examples: &[&str],
        candidate_titles: &[String],
    ) -> DiscoveryResult<Vec<String>> {
        let request = ChatRequest::new()
            .system(
                "You compare two lists of YouTube video titles and find which titles from the \
                 CANDIDATE list belong to the same series as the EXAMPLE list. A title matches \
                 only when it clearly follows the same recurring structure. Return ONLY a JSON \
                 object: {\"matching_titles\": [\"exact candidate titles\"]}. Copy candidate \
                 titles character-for-character. Return an empty list when nothing matches.",
            )
            .user(format!(
                "SERIES: {series_name}\n\nEXAMPLE TITLES:\n{}\n\nCANDIDATE TITLES:\n{}",
                examples.join("\n"),
                candidate_titles.join("\n")
            ))
            .max_tokens(2048)
            .temperature(0.0);

        let (response, _) = self.llm.call_structured::<MatchResponse>(&request).await?;

        // Keep only titles that are really in the candidate list.
        let verified = response
            .matching_titles
            .into_iter()
            .filter(|title| candidate_titles.iter().any(|c| c == title))
            .collect();
        Ok(verified)
    }
}

/// Deterministic fallback: a candidate title matches when it contains an
/// example title, case-insensitively.
pub fn substring_match(examples: &[&str], candidate_titles: &[String]) -> Vec<String> {
    candidate_titles
        .iter()
        .filter(|candidate| {
            let candidate_lower = candidate.to_lowercase();
            examples
                .iter()
                .any(|example| candidate_lower.contains(&example.to_lowercase()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_llm::LlmConfig;
    use tscout_models::{Series, Theme, Topic};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn taxonomy_with_examples(examples: &[&str]) -> TaxonomyTree {
        TaxonomyTree {
            series: vec![Series {
                name: "History for Sleep".to_string(),
                themes: vec![Theme {
                    name: "Rome".to_string(),
                    topics: examples
                        .iter()
                        .map(|e| Topic {
                            name: e.to_string(),
                            example: e.to_string(),
                            views: 0,
                            thumbnail_url: String::new(),
                            published_at: None,
                            video_id: None,
                            channel_id: None,
                        })
                        .collect(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn llm_reply(titles: &[&str]) -> serde_json::Value {
        json!({
            "id": "msg", "type": "message", "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": json!({"matching_titles": titles}).to_string()}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 10}
        })
    }

    #[tokio::test]
    async fn two_matches_are_not_eligible_three_are() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(llm_reply(&["A1", "A2"])))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let detector = SharedSeriesDetector::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let taxonomy = taxonomy_with_examples(&["A1", "A2", "A3"]);
        let candidates: Vec<String> = vec!["A1".into(), "A2".into(), "other".into()];

        let matches = detector.check_shared(&taxonomy, &candidates).await.unwrap();
        assert!(matches.is_empty());

        // A third matching title flips eligibility.
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(llm_reply(&["A1", "A2", "A3"])))
            .mount(&server)
            .await;
        let candidates: Vec<String> = vec!["A1".into(), "A2".into(), "A3".into()];
        let matches = detector.check_shared(&taxonomy, &candidates).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matching_titles.len(), 3);
    }

    #[tokio::test]
    async fn hallucinated_titles_are_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(llm_reply(&[
                "A1",
                "Completely Invented Title",
            ])))
            .mount(&server)
            .await;

        let detector = SharedSeriesDetector::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let taxonomy = taxonomy_with_examples(&["A1", "A2", "A3"]);
        let candidates: Vec<String> = vec!["A1".into()];

        let matches = detector.check_shared(&taxonomy, &candidates).await.unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn substring_fallback_matches_contained_examples() {
        let examples = vec!["The Fall of Rome"];
        let candidates: Vec<String> = vec![
            "The Fall of Rome (Full Documentary)".into(),
            "Fall of".into(),
            "Unrelated".into(),
        ];
        let matched = substring_match(&examples, &candidates);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0], "The Fall of Rome (Full Documentary)");
    }
}
