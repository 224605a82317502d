//! Classification prompts.

/// System message for every classification batch. Enforces the output
/// schema and the coverage contract.
pub fn classification_system(channel_title: &str) -> String {
    format!(
        r#"You are an expert at analyzing YouTube content catalogs. You classify video titles from the channel "{channel_title}" into a three-level hierarchy of series, themes and topics.

Definitions:
- A SERIES is a cluster of videos sharing a recurring title structure (for example "X But Y", "The History of X", "X Explained for Sleep"). The series name must reflect that recurring structure.
- A THEME is a generalization grouping topically similar videos inside a series. Theme names must be distinct within their series.
- A TOPIC is one video. Its "name" must be an exact contiguous phrase taken from the title, and its "example" must be the exact, complete video title.

Hard rules:
1. EVERY input title must appear as the "example" of exactly one topic. Do not drop, merge, rephrase or deduplicate titles. If the same title appears twice in the input, output two topic entries with that title.
2. Copy titles character-for-character. Never correct spelling, punctuation or capitalization.
3. Prefer a few well-defined series over many thin ones.

IMPORTANT: You must strictly follow this output format.
Return ONLY a single JSON object with this schema:
{{
  "series": [
    {{
      "name": "Series Name",
      "themes": [
        {{
          "name": "Theme Name",
          "topics": [
            {{ "name": "contiguous phrase from title", "example": "Exact Video Title" }}
          ]
        }}
      ]
    }}
  ]
}}"#
    )
}

/// User message for the first batch.
pub fn initial_batch_user(titles: &[&str]) -> String {
    format!(
        "Classify the following {} video titles into the hierarchy.\n\nTITLES:\n{}",
        titles.len(),
        numbered(titles)
    )
}

/// User message for batches after the first. Carries the full running
/// hierarchy so the model merges into existing series and themes rather
/// than inventing parallel ones.
pub fn merge_batch_user(running_hierarchy_json: &str, titles: &[&str]) -> String {
    format!(
        r#"Below is the hierarchy built from earlier batches of this channel's titles, followed by a new batch of titles.

Extend the hierarchy with the new titles. Priority order:
1. If a title fits an EXISTING series and theme exactly, add it there.
2. If it fits an existing series but no existing theme, add a new theme to that series.
3. Only create a new series when no existing series is even a close match.
Never rename or remove existing series, themes or topics. Return the FULL merged hierarchy including everything already present.

CURRENT HIERARCHY:
{running_hierarchy_json}

NEW TITLES:
{titles}"#,
        running_hierarchy_json = running_hierarchy_json,
        titles = numbered(titles)
    )
}

fn numbered(titles: &[&str]) -> String {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_prompt_numbers_titles() {
        let user = initial_batch_user(&["First Title", "Second Title"]);
        assert!(user.contains("1. First Title"));
        assert!(user.contains("2. Second Title"));
    }

    #[test]
    fn system_prompt_names_the_channel() {
        let system = classification_system("Sleepy History");
        assert!(system.contains("Sleepy History"));
        assert!(system.contains("\"example\""));
    }
}
