//! Plot outlines: duration-budgeted, timestamped segment plans.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::Timecode;

/// Hard cap on a single segment, in seconds.
pub const MAX_SEGMENT_SECS: u64 = 600;

/// Cap on the introduction (first) segment, in seconds.
pub const MAX_INTRO_SECS: u64 = 20;

/// Generic template labels that must be renamed to story-specific titles.
pub const GENERIC_SEGMENT_LABELS: &[&str] = &[
    "Introduction",
    "Conclusion",
    "Opening Title",
    "Opening",
    "Closing",
    "Outro",
    "Hook",
    "Main Content",
    "Primary Warning Signs",
    "Segment",
    "Summary",
];

/// One planned segment of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineSegment {
    pub name: String,
    pub start: Timecode,
    pub end: Timecode,
    pub duration_sec: u64,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// A complete plot outline for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlotOutline {
    pub title: String,
    pub total_duration_sec: u64,
    pub segments: Vec<OutlineSegment>,
}

/// Soundness violations detected by [`PlotOutline::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineValidationError {
    #[error("outline has no segments")]
    Empty,
    #[error("segment durations sum to {actual}s, expected {expected}s")]
    DurationMismatch { expected: u64, actual: u64 },
    #[error("segment '{name}' starts at {start} but previous segment ends at {prev_end}")]
    Gap {
        name: String,
        start: Timecode,
        prev_end: Timecode,
    },
    #[error("segment '{name}' duration {duration}s disagrees with its timestamps ({span}s)")]
    InternalMismatch {
        name: String,
        duration: u64,
        span: u64,
    },
    #[error("segment '{name}' runs {duration}s, above the {MAX_SEGMENT_SECS}s cap")]
    SegmentTooLong { name: String, duration: u64 },
    #[error("introduction segment '{name}' runs {duration}s, above the {MAX_INTRO_SECS}s cap")]
    IntroTooLong { name: String, duration: u64 },
    #[error("segment '{name}' keeps the generic template label")]
    GenericLabel { name: String },
}

impl PlotOutline {
    /// Check every soundness invariant:
    /// - durations sum to the total
    /// - segments are contiguous (`seg[i].end == seg[i+1].start`) and
    ///   internally consistent
    /// - no segment exceeds ten minutes; the first stays within 20 seconds
    /// - no segment keeps a generic template label
    pub fn validate(&self) -> Result<(), OutlineValidationError> {
        let Some(first) = self.segments.first() else {
            return Err(OutlineValidationError::Empty);
        };

        if first.duration_sec > MAX_INTRO_SECS {
            return Err(OutlineValidationError::IntroTooLong {
                name: first.name.clone(),
                duration: first.duration_sec,
            });
        }

        let mut total = 0u64;
        let mut prev_end: Option<Timecode> = None;

        for segment in &self.segments {
            if let Some(prev_end) = prev_end {
                if segment.start != prev_end {
                    return Err(OutlineValidationError::Gap {
                        name: segment.name.clone(),
                        start: segment.start,
                        prev_end,
                    });
                }
            }

            let span = segment.start.duration_until(segment.end);
            if span != segment.duration_sec {
                return Err(OutlineValidationError::InternalMismatch {
                    name: segment.name.clone(),
                    duration: segment.duration_sec,
                    span,
                });
            }

            if segment.duration_sec > MAX_SEGMENT_SECS {
                return Err(OutlineValidationError::SegmentTooLong {
                    name: segment.name.clone(),
                    duration: segment.duration_sec,
                });
            }

            if is_generic_label(&segment.name) {
                return Err(OutlineValidationError::GenericLabel {
                    name: segment.name.clone(),
                });
            }

            total += segment.duration_sec;
            prev_end = Some(segment.end);
        }

        if total != self.total_duration_sec {
            return Err(OutlineValidationError::DurationMismatch {
                expected: self.total_duration_sec,
                actual: total,
            });
        }

        Ok(())
    }
}

/// Whether a segment name is one of the forbidden generic template labels.
pub fn is_generic_label(name: &str) -> bool {
    let name = name.trim();
    GENERIC_SEGMENT_LABELS
        .iter()
        .any(|label| label.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(name: &str, start: u64, end: u64) -> OutlineSegment {
        OutlineSegment {
            name: name.to_string(),
            start: Timecode(start),
            end: Timecode(end),
            duration_sec: end - start,
            key_points: vec![],
        }
    }

    fn sound_outline() -> PlotOutline {
        PlotOutline {
            title: "The Fall of Carthage".to_string(),
            total_duration_sec: 920,
            segments: vec![
                segment("A City Doomed to Burn", 0, 20),
                segment("Rome's Final Ultimatum", 20, 500),
                segment("Ashes Over the Harbor", 500, 920),
            ],
        }
    }

    #[test]
    fn sound_outline_validates() {
        assert!(sound_outline().validate().is_ok());
    }

    #[test]
    fn detects_duration_mismatch() {
        let mut outline = sound_outline();
        outline.total_duration_sec = 900;
        assert!(matches!(
            outline.validate(),
            Err(OutlineValidationError::DurationMismatch { expected: 900, actual: 920 })
        ));
    }

    #[test]
    fn detects_gap_between_segments() {
        let mut outline = sound_outline();
        outline.segments[2].start = Timecode(510);
        outline.segments[2].duration_sec = 410;
        assert!(matches!(
            outline.validate(),
            Err(OutlineValidationError::Gap { .. })
        ));
    }

    #[test]
    fn detects_overlong_segment() {
        let outline = PlotOutline {
            title: "t".to_string(),
            total_duration_sec: 720,
            segments: vec![
                segment("A Quiet Opening Scene", 0, 15),
                segment("The Siege Drags On", 15, 720),
            ],
        };
        assert!(matches!(
            outline.validate(),
            Err(OutlineValidationError::SegmentTooLong { duration: 705, .. })
        ));
    }

    #[test]
    fn detects_overlong_intro() {
        let outline = PlotOutline {
            title: "t".to_string(),
            total_duration_sec: 120,
            segments: vec![segment("A Slow Burning Start", 0, 45), segment("Then It Happens", 45, 120)],
        };
        assert!(matches!(
            outline.validate(),
            Err(OutlineValidationError::IntroTooLong { duration: 45, .. })
        ));
    }

    #[test]
    fn detects_generic_labels() {
        let mut outline = sound_outline();
        outline.segments[1].name = "Introduction".to_string();
        assert!(matches!(
            outline.validate(),
            Err(OutlineValidationError::GenericLabel { .. })
        ));
        assert!(is_generic_label("conclusion"));
        assert!(!is_generic_label("Rome's Final Ultimatum"));
    }

    #[test]
    fn empty_outline_is_invalid() {
        let outline = PlotOutline {
            title: "t".to_string(),
            total_duration_sec: 0,
            segments: vec![],
        };
        assert_eq!(outline.validate(), Err(OutlineValidationError::Empty));
    }
}
