//! ISO-8601 duration parsing (`PT#H#M#S`).

/// Parse a YouTube `contentDetails.duration` string into seconds.
///
/// Returns 0 for unparsable input; the API occasionally sends `P0D` for
/// live streams and premieres.
pub fn parse_iso8601_duration(s: &str) -> u64 {
    let s = s.trim();
    let Some(rest) = s.strip_prefix('P') else {
        return 0;
    };

    let mut seconds = 0u64;
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let value: u64 = number.parse().unwrap_or(0);
                number.clear();
                seconds += match (unit, in_time) {
                    ('D', false) => value * 86_400,
                    ('H', true) => value * 3_600,
                    ('M', true) => value * 60,
                    ('S', true) => value,
                    // Weeks/months/years never show up for videos.
                    _ => 0,
                };
            }
        }
    }

    seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_durations() {
        assert_eq!(parse_iso8601_duration("PT15S"), 15);
        assert_eq!(parse_iso8601_duration("PT4M13S"), 253);
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso8601_duration("PT2H"), 7200);
        assert_eq!(parse_iso8601_duration("P1DT30M"), 88_200);
    }

    #[test]
    fn unparsable_input_is_zero() {
        assert_eq!(parse_iso8601_duration("P0D"), 0);
        assert_eq!(parse_iso8601_duration(""), 0);
        assert_eq!(parse_iso8601_duration("garbage"), 0);
    }
}
