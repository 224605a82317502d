//! Segment output cleanup.
//!
//! Models leak meta-sentences, duplicate headers and word-count trailers
//! into otherwise good segments. Everything here is deterministic repair
//! that preserves the dialogue.

use std::sync::LazyLock;

use regex::Regex;

use tscout_models::is_dialogue_line;

/// Meta-sentence openers the model prepends before the real output.
const META_OPENERS: &[&str] = &[
    "i understand",
    "here is",
    "here's",
    "certainly",
    "sure,",
    "sure!",
    "of course",
    "below is",
];

static WORD_COUNT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\(?\s*word count\s*:?\s*[\d,~]+\s*\)?\s*$").expect("word count regex compiles")
});

static BARE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\d,]+\s*(words)?\s*$").expect("bare number regex compiles"));

/// Clean one generated segment into `header + dialogue lines`.
///
/// - strips a leading meta-sentence
/// - removes `Word count: N` and bare-number trailers
/// - keeps exactly one header (the expected one), dropping repeats
/// - prepends `[host_name]:` to dialogue-looking lines that lack a
///   speaker tag; drops lines that do not look like dialogue
pub fn clean_segment(raw: &str, expected_header: &str, host_name: &str) -> String {
    let mut body_lines: Vec<String> = Vec::new();
    let mut seen_header = false;

    for (i, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !body_lines.is_empty() {
                body_lines.push(String::new());
            }
            continue;
        }

        if is_header_line(trimmed, expected_header) {
            // Keep only the first occurrence; repeats get dropped.
            seen_header = true;
            continue;
        }

        if i == 0 || (!seen_header && body_lines.is_empty()) {
            if is_meta_opener(trimmed) {
                continue;
            }
        }

        if WORD_COUNT_LINE.is_match(trimmed) || BARE_NUMBER_LINE.is_match(trimmed) {
            continue;
        }

        if is_dialogue_line(trimmed) {
            body_lines.push(trimmed.to_string());
        } else if looks_like_dialogue(trimmed) {
            body_lines.push(format!("[{host_name}]: {trimmed}"));
        }
        // Anything else is meta-commentary and gets dropped.
    }

    // Collapse trailing blank lines.
    while body_lines.last().is_some_and(|l| l.is_empty()) {
        body_lines.pop();
    }

    format!("{}\n{}", expected_header, body_lines.join("\n"))
}

fn is_header_line(line: &str, expected_header: &str) -> bool {
    line == expected_header
        // Header with the name right but timestamps mangled still counts.
        || (line.contains("Duration:") && !is_dialogue_line(line))
}

fn is_meta_opener(line: &str) -> bool {
    let lower = line.to_lowercase();
    META_OPENERS.iter().any(|opener| lower.starts_with(opener))
}

/// Untagged lines that read as dialogue: quoted speech or a narrative
/// sentence. Markdown, brackets-only noise and stage directions do not.
fn looks_like_dialogue(line: &str) -> bool {
    if line.starts_with('"') || line.starts_with('\u{201c}') {
        return true;
    }
    let first = line.chars().next().unwrap_or(' ');
    first.is_alphabetic() && line.split_whitespace().count() >= 3
}

/// Verify a cleaned segment: first line is the header, everything else
/// blank or dialogue.
pub fn segment_is_well_formed(text: &str, expected_header: &str) -> bool {
    let mut lines = text.lines();
    if lines.next() != Some(expected_header) {
        return false;
    }
    lines.all(|line| line.trim().is_empty() || is_dialogue_line(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Rome's Final Ultimatum (00:00:20 - 00:08:20, Duration: 00:08:00)";

    #[test]
    fn strips_meta_preamble_and_wordcount() {
        let raw = format!(
            "I understand, here is the segment as requested.\n{HEADER}\n[NARRATOR]: The senate had decided.\n\nWord count: 1714"
        );
        let cleaned = clean_segment(&raw, HEADER, "Marcus");
        assert_eq!(
            cleaned,
            format!("{HEADER}\n[NARRATOR]: The senate had decided.")
        );
        assert!(segment_is_well_formed(&cleaned, HEADER));
    }

    #[test]
    fn duplicate_headers_are_dropped() {
        let raw = format!("{HEADER}\n[A]: one.\n{HEADER}\n[A]: two.");
        let cleaned = clean_segment(&raw, HEADER, "Marcus");
        assert_eq!(cleaned.matches("Duration:").count(), 1);
        assert!(cleaned.contains("[A]: one."));
        assert!(cleaned.contains("[A]: two."));
    }

    #[test]
    fn missing_header_is_restored() {
        let raw = "[NARRATOR]: straight into dialogue.";
        let cleaned = clean_segment(raw, HEADER, "Marcus");
        assert!(cleaned.starts_with(HEADER));
    }

    #[test]
    fn untagged_narrative_lines_get_the_host_tag() {
        let raw = format!("{HEADER}\nThe fleet was already burning when dawn came.");
        let cleaned = clean_segment(&raw, HEADER, "Marcus");
        assert!(cleaned.contains("[Marcus]: The fleet was already burning when dawn came."));
    }

    #[test]
    fn quoted_lines_get_the_host_tag() {
        let raw = format!("{HEADER}\n\"Carthage must fall.\"");
        let cleaned = clean_segment(&raw, HEADER, "Marcus");
        assert!(cleaned.contains("[Marcus]: \"Carthage must fall.\""));
    }

    #[test]
    fn non_dialogue_noise_is_dropped() {
        let raw = format!("{HEADER}\n---\n### Notes\n1714\n[A]: kept.");
        let cleaned = clean_segment(&raw, HEADER, "Marcus");
        assert_eq!(cleaned, format!("{HEADER}\n[A]: kept."));
    }

    #[test]
    fn well_formed_check_rejects_stray_lines() {
        let good = format!("{HEADER}\n[A]: fine.");
        assert!(segment_is_well_formed(&good, HEADER));
        let bad = format!("{HEADER}\n[A]: fine.\nstray note");
        assert!(!segment_is_well_formed(&bad, HEADER));
    }
}
