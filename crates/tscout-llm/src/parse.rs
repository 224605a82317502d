//! JSON extraction from free-form model output.
//!
//! Models wrap JSON in code fences or lead with prose more often than one
//! would hope. The extractor strips common wrappers and pulls out the
//! first balanced JSON value.

/// Extract the first balanced JSON object or array from `text`.
///
/// Handles:
/// - triple-backtick fences (with or without a `json` tag)
/// - leading prose before the first `{` or `[`
/// - trailing text after the balanced value
pub fn extract_json(text: &str) -> Option<&str> {
    let text = strip_code_fence(text.trim());

    let start = text.find(|c| c == '{' || c == '[')?;
    let open = text.as_bytes()[start] as char;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn strips_json_code_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn skips_leading_prose_and_trailing_text() {
        let text = "Here is the hierarchy you asked for:\n{\"series\": []}\nLet me know!";
        assert_eq!(extract_json(text), Some("{\"series\": []}"));
    }

    #[test]
    fn extracts_array() {
        let text = "Sure: [1, 2, 3] done";
        assert_eq!(extract_json(text), Some("[1, 2, 3]"));
    }

    #[test]
    fn handles_braces_inside_strings() {
        let text = r#"{"title": "a } tricky { one"}"#;
        assert_eq!(extract_json(text), Some(text));
    }

    #[test]
    fn handles_escaped_quotes() {
        let text = r#"{"quote": "she said \"}\" loudly"}"#;
        assert_eq!(extract_json(text), Some(text));
    }

    #[test]
    fn unbalanced_input_yields_none() {
        assert_eq!(extract_json("{\"a\": [1, 2"), None);
        assert_eq!(extract_json("no json here"), None);
    }
}
