//! Script breakdowns and rendered full scripts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::timestamp::Timecode;

/// Separator inserted between rendered segments.
pub const SEGMENT_BREAK: &str = "=== SEGMENT BREAK ===";

/// A transcript-derived template capturing the structure and writing
/// voice of an existing series. At most one per (series, theme).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptBreakdown {
    pub project_id: ProjectId,
    pub series_name: String,
    pub theme_name: String,
    /// Whether the analyzed videos react to external clips rather than
    /// carrying a self-contained narrative.
    pub is_clip_reactive: bool,
    /// The full breakdown text: video structure with timestamps, segment
    /// outline template, transition techniques, recurring elements, script
    /// template and writing style analysis.
    pub script_breakdown: String,
    pub created_at: DateTime<Utc>,
}

/// One rendered segment of a full script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptSegment {
    /// Position in the outline; rendering preserves this order.
    pub index: usize,
    pub name: String,
    /// Exact header line: `Name (HH:MM:SS - HH:MM:SS, Duration: D)`
    pub header: String,
    /// Dialogue body; every non-blank line is `[SPEAKER]: utterance`.
    pub body: String,
}

impl ScriptSegment {
    /// Build the canonical header line for a segment.
    pub fn format_header(name: &str, start: Timecode, end: Timecode, duration_sec: u64) -> String {
        format!("{} ({} - {}, Duration: {})", name, start, end, Timecode(duration_sec))
    }

    /// Render header plus body.
    pub fn render(&self) -> String {
        format!("{}\n{}", self.header, self.body)
    }
}

/// An ordered, fully rendered script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FullScript {
    pub title: String,
    pub series_name: String,
    pub theme_name: String,
    pub segments: Vec<ScriptSegment>,
    pub generated_at: DateTime<Utc>,
}

impl FullScript {
    /// Concatenate all segments in index order, joined by the segment break.
    pub fn render(&self) -> String {
        let mut ordered: Vec<&ScriptSegment> = self.segments.iter().collect();
        ordered.sort_by_key(|s| s.index);
        ordered
            .iter()
            .map(|s| s.render())
            .collect::<Vec<_>>()
            .join(&format!("\n\n{}\n\n", SEGMENT_BREAK))
    }
}

/// Whether a line is a well-formed dialogue line (`[SPEAKER]: …`).
pub fn is_dialogue_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('[') else {
        return false;
    };
    let Some(close) = rest.find(']') else {
        return false;
    };
    if close == 0 {
        return false;
    }
    let after = &rest[close + 1..];
    after.starts_with(": ") || after.starts_with(":\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: usize, name: &str) -> ScriptSegment {
        ScriptSegment {
            index,
            name: name.to_string(),
            header: ScriptSegment::format_header(name, Timecode(0), Timecode(20), 20),
            body: "[NARRATOR]: Once upon a time.".to_string(),
        }
    }

    #[test]
    fn header_format_matches_contract() {
        let header = ScriptSegment::format_header("The Gathering Storm", Timecode(20), Timecode(500), 480);
        assert_eq!(header, "The Gathering Storm (00:00:20 - 00:08:20, Duration: 00:08:00)");
    }

    #[test]
    fn render_orders_segments_by_index() {
        let script = FullScript {
            title: "t".to_string(),
            series_name: "s".to_string(),
            theme_name: "th".to_string(),
            segments: vec![segment(2, "Third"), segment(0, "First"), segment(1, "Second")],
            generated_at: Utc::now(),
        };

        let rendered = script.render();
        let first = rendered.find("First").unwrap();
        let second = rendered.find("Second").unwrap();
        let third = rendered.find("Third").unwrap();
        assert!(first < second && second < third);
        assert_eq!(rendered.matches(SEGMENT_BREAK).count(), 2);
    }

    #[test]
    fn dialogue_line_shape() {
        assert!(is_dialogue_line("[NARRATOR]: The city fell."));
        assert!(is_dialogue_line("[Dr. Helen Cho]: Look at this."));
        assert!(!is_dialogue_line("The city fell."));
        assert!(!is_dialogue_line("[]: empty speaker"));
        assert!(!is_dialogue_line("[NARRATOR] missing colon"));
        assert!(!is_dialogue_line("[NARRATOR]:no space"));
    }
}
