//! Prompt builders for the script pipeline.

use tscout_models::GENERIC_SEGMENT_LABELS;

/// System message for the per-transcript style analysis pass.
pub fn style_analysis_system() -> String {
    r#"You are a video script analyst. You study one video transcript from an established series and extract a reusable production template.

Produce an analysis with these sections:
1. VIDEO STRUCTURE - every structural segment of the video with its timestamps.
2. SEGMENT OUTLINE TEMPLATE - a generic per-video template listing each segment with its typical plot points and duration. No segment in the template may exceed 10 minutes; split anything longer.
3. TRANSITION TECHNIQUES - 3 to 5 techniques this series uses to move between segments.
4. RECURRING ELEMENTS - 3 to 5 elements that appear in every video of the series.
5. SCRIPT TEMPLATE - a fill-in-the-blanks skeleton a writer could follow.
6. TONE AND STYLE - delivery, energy, pacing of the narration.
7. WRITING STYLE ANALYSIS - sentence structure, vocabulary level, pacing, rhetorical devices, character voice, engagement techniques, and callbacks/running gags.

Replace every channel-specific name with [CHANNEL_NAME] and every host name with [HOST_NAME] in all examples.

Also decide whether the video is CLIP-REACTIVE: built around reacting to external clips rather than carrying a self-contained narrative.

Return ONLY a JSON object:
{"is_clip_reactive": false, "script_breakdown": "<the full analysis text>"}"#
        .to_string()
}

/// User message for one transcript.
pub fn style_analysis_user(
    title: &str,
    description: &str,
    duration_secs: u64,
    transcript: &str,
) -> String {
    format!(
        "VIDEO TITLE: {title}\nVIDEO DESCRIPTION: {description}\nVIDEO DURATION: {} minutes\n\nTRANSCRIPT:\n{transcript}",
        duration_secs / 60
    )
}

/// Merge several per-transcript breakdowns into one unified template.
pub fn merge_breakdowns_user(breakdowns: &[String]) -> String {
    let mut user = String::from(
        "Below are script breakdowns of several videos from the same series. Merge them into ONE \
         unified breakdown that captures the common structure while preserving all timing detail. \
         Keep every section from the originals. Return ONLY a JSON object: \
         {\"is_clip_reactive\": false, \"script_breakdown\": \"<merged analysis>\"}\n",
    );
    for (i, breakdown) in breakdowns.iter().enumerate() {
        user.push_str(&format!("\n--- BREAKDOWN {} ---\n{}\n", i + 1, breakdown));
    }
    user
}

/// System message for plot outline generation.
pub fn outline_system(video_length_min: u32) -> String {
    let forbidden = GENERIC_SEGMENT_LABELS.join("\", \"");
    format!(
        r#"You are a story planner for long-form videos. Produce a complete plot outline for a {video_length_min}-minute video.

Output format, exactly:

Video Structure:
1. Segment Name (HH:MM:SS - HH:MM:SS, Duration: HH:MM:SS)
   - key point
   - key point
2. ...

Hard rules:
- Use exact HH:MM:SS timestamps. Every segment's start must equal the previous segment's end, the first segment starts at 00:00:00, and the durations must sum to exactly {video_length_min} minutes.
- List EVERY segment. Never write "continue", "and so on" or placeholders.
- The introduction (first) segment must be at most 20 seconds.
- No segment may be longer than 10 minutes. Split anything longer into multiple segments.
- Give each segment 2 to 4 key points.
- RENAME the breakdown's generic segment labels to story-specific titles of 2-6 words. Forbidden labels include: "{forbidden}". A good title names what actually happens, like "Rome's Final Ultimatum" or "Ashes Over the Harbor"."#
    )
}

/// User message for plot outline generation.
pub fn outline_user(title: &str, series: &str, theme: &str, breakdown: &str) -> String {
    format!(
        "VIDEO TITLE: {title}\nSERIES: {series}\nTHEME: {theme}\n\nSCRIPT BREAKDOWN TO FOLLOW:\n{breakdown}"
    )
}

/// Instruction used when the model stops mid-outline and asks to continue.
pub fn outline_continue_user() -> String {
    "Continue the Video Structure section EXACTLY where it stopped. Output only the remaining \
     numbered segments in the same format, nothing else. Do not repeat segments already listed."
        .to_string()
}

/// Static rules block for segment generation. Shared verbatim across
/// every segment call of a script, so it carries the cache hint.
pub fn segment_guidelines(host_name: &str) -> String {
    format!(
        r#"You write video script segments. Strict output rules:
1. The FIRST line of your output is the exact segment header you are given, nothing before it.
2. Every other non-blank line must be a dialogue line of the form [NAME]: text - speaker name in square brackets, a colon, a space, then the line.
3. No meta-commentary, no stage directions, no markdown, no "Word count:" trailers, no notes to the editor.
4. Replace any channel-specific phrase from the breakdown with the host's actual name. The host is [{host_name}].
5. Write in the voice captured by the breakdown's Writing Style Analysis: match its sentence structure, vocabulary, pacing, rhetorical devices and engagement techniques.
6. Hit the word target you are given. Do not pad with filler; expand the story's detail instead."#
    )
}

/// Shared context block for a script's segment calls: identical across
/// every segment and chunk of one script, so it carries the cache hint.
pub fn segment_context(
    title: &str,
    outline_text: &str,
    breakdown: &str,
    characters: &[String],
    host_name: &str,
    sponsored: Option<&str>,
) -> String {
    let mut context = format!(
        "VIDEO TITLE: {title}\n\nFULL PLOT OUTLINE:\n{outline_text}\n\nSCRIPT BREAKDOWN:\n{breakdown}\n\nCHARACTERS: {}\nHOST: {host_name}\n",
        if characters.is_empty() {
            host_name.to_string()
        } else {
            characters.join(", ")
        }
    );

    if let Some(sponsored) = sponsored {
        context.push_str(&format!(
            "\nSPONSORED SEGMENT: integrate the following sponsor message naturally after the \
             hook and before the main content: {sponsored}\n"
        ));
    }

    context
}

/// Per-segment (and per-chunk) task block.
pub fn segment_task(
    header: &str,
    key_points: &[String],
    target_words: usize,
    chunk: Option<(usize, usize)>,
) -> String {
    let mut task = format!(
        "Write the segment with this exact header:\n{header}\n\nKey points to cover:\n{}\n\nTarget length: about {target_words} words.",
        key_points
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n")
    );

    if let Some((index, total)) = chunk {
        task.push_str(&format!(
            "\n\nThis segment is written in {total} parts. Write part {} of {total}.",
            index + 1
        ));
        if index > 0 {
            task.push_str(" Do NOT repeat the header; continue the dialogue directly.");
        }
    }

    task
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_system_lists_forbidden_labels() {
        let system = outline_system(60);
        assert!(system.contains("\"Introduction\""));
        assert!(system.contains("60-minute"));
    }

    #[test]
    fn segment_task_marks_chunks() {
        let task = segment_task(
            "Header (00:00:00 - 00:00:20, Duration: 00:00:20)",
            &["point".to_string()],
            1800,
            Some((1, 4)),
        );
        assert!(task.contains("part 2 of 4"));
        assert!(task.contains("Do NOT repeat the header"));
    }

    #[test]
    fn sponsored_block_is_optional() {
        let without = segment_context("T", "o", "b", &[], "H", None);
        assert!(!without.contains("SPONSORED"));
        let with = segment_context("T", "o", "b", &[], "H", Some("try NordVPN"));
        assert!(with.contains("SPONSORED"));
        assert!(with.contains("after the"));
    }
}
