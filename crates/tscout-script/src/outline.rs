//! Plot outline generation and parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use tscout_llm::{ChatRequest, LlmClient};
use tscout_models::{OutlineSegment, PlotOutline, Timecode};

use crate::error::{ScriptError, ScriptResult};
use crate::prompts;

/// Markers the model emits when it stops mid-outline.
const CONTINUATION_MARKERS: &[&str] = &[
    "would you like me to continue",
    "shall i continue",
    "let me know if you'd like me to continue",
];

/// Maximum continuation calls per outline.
const MAX_CONTINUATIONS: u32 = 3;

/// `1. Segment Name (HH:MM:SS - HH:MM:SS, Duration: HH:MM:SS)`
/// with `MM:SS` accepted everywhere and unbounded hours.
static SEGMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*\d+\.\s+(?P<name>.+?)\s+\((?P<start>\d+(?::\d{1,2}){1,2})\s*-\s*(?P<end>\d+(?::\d{1,2}){1,2})\s*,\s*Duration:\s*(?P<duration>\d+(?::\d{1,2}){1,2})\s*\)\s*$",
    )
    .expect("segment line regex compiles")
});

/// `- key point` / `• key point` bullets under a segment line.
static KEY_POINT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•*]\s+(?P<point>.+?)\s*$").expect("key point regex compiles"));

/// Generates and validates plot outlines.
pub struct OutlineGenerator {
    llm: LlmClient,
}

impl OutlineGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Generate an outline for `title`, recovering from mid-output
    /// continuation prompts, then parse and validate it.
    pub async fn outline(
        &self,
        title: &str,
        breakdown: &str,
        series: &str,
        theme: &str,
        video_length_min: u32,
    ) -> ScriptResult<PlotOutline> {
        if video_length_min == 0 {
            return Err(ScriptError::validation("video length must be positive"));
        }

        let system = prompts::outline_system(video_length_min);
        let base_user = prompts::outline_user(title, series, theme, breakdown);

        let request = ChatRequest::new()
            .system_cached(system.clone())
            .user(base_user.clone())
            .max_tokens(8192)
            .temperature(0.4);

        let mut text = self.llm.call(&request).await?.text;

        // The model sometimes stops and asks to continue. Strip the
        // marker and ask for the rest of the Video Structure only.
        let mut continuations = 0;
        while has_continuation_marker(&text) && continuations < MAX_CONTINUATIONS {
            continuations += 1;
            debug!(continuations, "outline stopped early, requesting continuation");

            let request = ChatRequest::new()
                .system_cached(system.clone())
                .user(base_user.clone())
                .user(format!(
                    "YOUR OUTPUT SO FAR:\n{}\n\n{}",
                    strip_continuation_marker(&text),
                    prompts::outline_continue_user()
                ))
                .max_tokens(8192)
                .temperature(0.4);

            let continuation = self.llm.call(&request).await?.text;
            text = format!("{}\n{}", strip_continuation_marker(&text), continuation);
        }

        let outline = parse_outline(title, &text)?;
        let expected_total = u64::from(video_length_min) * 60;
        if outline.total_duration_sec != expected_total {
            return Err(ScriptError::validation(format!(
                "outline runs {}s, requested {}s",
                outline.total_duration_sec, expected_total
            )));
        }
        outline.validate()?;

        info!(
            title,
            segments = outline.segments.len(),
            continuations,
            "generated plot outline"
        );
        Ok(outline)
    }
}

/// Whether the output contains a mid-outline continuation question.
pub fn has_continuation_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTINUATION_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn strip_continuation_marker(text: &str) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if CONTINUATION_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }
        cleaned.push(line);
    }
    cleaned.join("\n")
}

/// Parse the Video Structure block into a [`PlotOutline`].
///
/// Total duration is the sum of the parsed segment durations; callers
/// check it against the requested length.
pub fn parse_outline(title: &str, text: &str) -> ScriptResult<PlotOutline> {
    let mut segments: Vec<OutlineSegment> = Vec::new();

    for line in text.lines() {
        if let Some(captures) = SEGMENT_LINE.captures(line) {
            let name = captures["name"].trim().to_string();
            let start = Timecode::from_str(&captures["start"])
                .map_err(|e| ScriptError::parse(e.to_string()))?;
            let end = Timecode::from_str(&captures["end"])
                .map_err(|e| ScriptError::parse(e.to_string()))?;
            let duration = Timecode::from_str(&captures["duration"])
                .map_err(|e| ScriptError::parse(e.to_string()))?;

            segments.push(OutlineSegment {
                name,
                start,
                end,
                duration_sec: duration.as_secs(),
                key_points: Vec::new(),
            });
        } else if let Some(captures) = KEY_POINT_LINE.captures(line) {
            if let Some(segment) = segments.last_mut() {
                segment.key_points.push(captures["point"].to_string());
            }
        }
    }

    if segments.is_empty() {
        return Err(ScriptError::parse(
            "no segment lines found in Video Structure",
        ));
    }

    let total_duration_sec = segments.iter().map(|s| s.duration_sec).sum();
    Ok(PlotOutline {
        title: title.to_string(),
        total_duration_sec,
        segments,
    })
}

/// Render an outline back into the numbered text form used in prompts.
pub fn render_outline(outline: &PlotOutline) -> String {
    let mut text = String::from("Video Structure:\n");
    for (i, segment) in outline.segments.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} ({} - {}, Duration: {})\n",
            i + 1,
            segment.name,
            segment.start,
            segment.end,
            Timecode(segment.duration_sec)
        ));
        for point in &segment.key_points {
            text.push_str(&format!("   - {point}\n"));
        }
    }
    text
}
