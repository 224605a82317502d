//! Transcript-driven style analysis.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use tscout_llm::{ChatRequest, LlmClient};
use tscout_models::{ProjectId, ScriptBreakdown};
use tscout_youtube::Transcript;

use crate::error::{ScriptError, ScriptResult};
use crate::prompts;

/// One analyzed source video.
pub struct BreakdownSource<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub duration_secs: u64,
    pub transcript: &'a Transcript,
}

#[derive(Debug, Deserialize)]
struct BreakdownWire {
    #[serde(default)]
    is_clip_reactive: bool,
    script_breakdown: String,
}

/// Produces a [`ScriptBreakdown`] from one or more source transcripts.
pub struct BreakdownGenerator {
    llm: LlmClient,
}

impl BreakdownGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Analyze each transcript, then (for multiple sources) merge the
    /// per-video analyses into one unified breakdown.
    pub async fn breakdown(
        &self,
        project_id: &ProjectId,
        series_name: &str,
        theme_name: &str,
        sources: &[BreakdownSource<'_>],
    ) -> ScriptResult<ScriptBreakdown> {
        if sources.is_empty() {
            return Err(ScriptError::validation("no transcripts to analyze"));
        }

        let system = prompts::style_analysis_system();
        let mut analyses: Vec<BreakdownWire> = Vec::with_capacity(sources.len());

        for source in sources {
            let request = ChatRequest::new()
                .system_cached(system.clone())
                .user(prompts::style_analysis_user(
                    source.title,
                    source.description,
                    source.duration_secs,
                    &source.transcript.render_with_timestamps(),
                ))
                .max_tokens(8192)
                .temperature(0.3);

            let (wire, _) = self.llm.call_structured::<BreakdownWire>(&request).await?;
            analyses.push(wire);
        }

        let unified = if analyses.len() == 1 {
            analyses.remove(0)
        } else {
            let texts: Vec<String> = analyses.iter().map(|a| a.script_breakdown.clone()).collect();
            let request = ChatRequest::new()
                .system_cached(system)
                .user(prompts::merge_breakdowns_user(&texts))
                .max_tokens(8192)
                .temperature(0.3);
            let (mut merged, _) = self.llm.call_structured::<BreakdownWire>(&request).await?;
            // A series is clip-reactive if any analyzed video was.
            merged.is_clip_reactive |= analyses.iter().any(|a| a.is_clip_reactive);
            merged
        };

        info!(
            series = series_name,
            theme = theme_name,
            sources = sources.len(),
            clip_reactive = unified.is_clip_reactive,
            "built script breakdown"
        );

        Ok(ScriptBreakdown {
            project_id: project_id.clone(),
            series_name: series_name.to_string(),
            theme_name: theme_name.to_string(),
            is_clip_reactive: unified.is_clip_reactive,
            script_breakdown: unified.script_breakdown,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_llm::LlmConfig;
    use tscout_youtube::TranscriptLine;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    fn transcript() -> Transcript {
        Transcript {
            lines: vec![TranscriptLine {
                start_secs: 0.0,
                text: "welcome back to the channel".to_string(),
            }],
        }
    }

    fn reply(body: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "msg", "type": "message", "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": body.to_string()}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 10}
        })
    }

    #[tokio::test]
    async fn single_transcript_needs_no_merge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(json!({
                "is_clip_reactive": false,
                "script_breakdown": "VIDEO STRUCTURE: ..."
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let generator = BreakdownGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let transcript = transcript();
        let sources = vec![BreakdownSource {
            title: "The Fall of Rome",
            description: "desc",
            duration_secs: 3600,
            transcript: &transcript,
        }];

        let breakdown = generator
            .breakdown(&ProjectId::from("p1"), "History for Sleep", "Rome", &sources)
            .await
            .unwrap();
        assert!(!breakdown.is_clip_reactive);
        assert_eq!(breakdown.series_name, "History for Sleep");
        assert!(breakdown.script_breakdown.contains("VIDEO STRUCTURE"));
    }

    #[tokio::test]
    async fn multiple_transcripts_are_merged_and_flag_is_sticky() {
        struct Responder {
            calls: std::sync::atomic::AtomicU32,
        }
        impl Respond for Responder {
            fn respond(&self, _: &wiremock::Request) -> ResponseTemplate {
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let body = match n {
                    0 => json!({"is_clip_reactive": true, "script_breakdown": "analysis one"}),
                    1 => json!({"is_clip_reactive": false, "script_breakdown": "analysis two"}),
                    // The merge reply forgets the flag; the generator
                    // must carry it over from the per-video analyses.
                    _ => json!({"is_clip_reactive": false, "script_breakdown": "merged"}),
                };
                ResponseTemplate::new(200).set_body_json(reply(body))
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(Responder {
                calls: std::sync::atomic::AtomicU32::new(0),
            })
            .expect(3)
            .mount(&server)
            .await;

        let generator = BreakdownGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let t1 = transcript();
        let t2 = transcript();
        let sources = vec![
            BreakdownSource { title: "A", description: "", duration_secs: 60, transcript: &t1 },
            BreakdownSource { title: "B", description: "", duration_secs: 60, transcript: &t2 },
        ];

        let breakdown = generator
            .breakdown(&ProjectId::from("p1"), "S", "T", &sources)
            .await
            .unwrap();
        assert!(breakdown.is_clip_reactive);
        assert_eq!(breakdown.script_breakdown, "merged");
    }

    #[tokio::test]
    async fn empty_sources_are_rejected() {
        let server = MockServer::start().await;
        let generator = BreakdownGenerator::new(
            LlmClient::new(LlmConfig::new("k").with_base_url(server.uri())).unwrap(),
        );
        let err = generator
            .breakdown(&ProjectId::from("p1"), "S", "T", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Validation(_)));
    }
}
