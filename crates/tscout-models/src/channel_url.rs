//! Channel URL parsing.
//!
//! Accepts every channel URL shape YouTube has shipped over the years and
//! normalizes it into a [`ChannelRef`] that the search client can resolve.

/// Errors that can occur while parsing a channel URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelUrlError {
    /// URL is not a recognized YouTube URL
    NotYoutube,
    /// URL points at YouTube but not at a channel
    NotAChannel,
    /// Channel reference is empty or malformed
    MalformedReference,
}

impl std::fmt::Display for ChannelUrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelUrlError::NotYoutube => write!(f, "URL is not a YouTube URL"),
            ChannelUrlError::NotAChannel => write!(f, "URL does not reference a channel"),
            ChannelUrlError::MalformedReference => write!(f, "channel reference is malformed"),
        }
    }
}

impl std::error::Error for ChannelUrlError {}

/// A normalized reference to a channel, before API resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Canonical channel ID (`/channel/UC…`). Resolvable without a lookup.
    Id(String),
    /// Handle (`/@name` or a bare `@name`).
    Handle(String),
    /// Legacy custom URL (`/c/name`).
    Custom(String),
    /// Legacy username (`/user/name`).
    User(String),
}

impl ChannelRef {
    /// The raw reference string, without any path prefix.
    pub fn as_str(&self) -> &str {
        match self {
            ChannelRef::Id(s) | ChannelRef::Handle(s) | ChannelRef::Custom(s) | ChannelRef::User(s) => s,
        }
    }
}

/// Parse a channel URL (or bare `@handle`) into a [`ChannelRef`].
///
/// Supported forms:
/// - `https://youtube.com/channel/UCxxxx`
/// - `https://youtube.com/@handle`
/// - `https://youtube.com/c/CustomName`
/// - `https://youtube.com/user/LegacyName`
/// - `@handle`
pub fn parse_channel_url(input: &str) -> Result<ChannelRef, ChannelUrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ChannelUrlError::MalformedReference);
    }

    // Bare handle shortcut, no domain required.
    if let Some(handle) = input.strip_prefix('@') {
        return validate_segment(handle).map(|h| ChannelRef::Handle(h.to_string()));
    }

    if !is_youtube_domain(input) {
        return Err(ChannelUrlError::NotYoutube);
    }

    if let Some(id) = extract_after(input, "/channel/") {
        let id = validate_segment(id)?;
        if !id.starts_with("UC") || id.len() < 10 {
            return Err(ChannelUrlError::MalformedReference);
        }
        return Ok(ChannelRef::Id(id.to_string()));
    }

    if let Some(handle) = extract_after(input, "/@") {
        return validate_segment(handle).map(|h| ChannelRef::Handle(h.to_string()));
    }

    if let Some(name) = extract_after(input, "/c/") {
        return validate_segment(name).map(|n| ChannelRef::Custom(n.to_string()));
    }

    if let Some(name) = extract_after(input, "/user/") {
        return validate_segment(name).map(|n| ChannelRef::User(n.to_string()));
    }

    Err(ChannelUrlError::NotAChannel)
}

fn is_youtube_domain(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Return the path segment following `marker`, trimmed at the first
/// `/`, `?` or `#`.
fn extract_after<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    let pos = url.find(marker)?;
    let start = pos + marker.len();
    if start >= url.len() {
        return None;
    }
    let rest = &url[start..];
    let end = rest
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn validate_segment(segment: &str) -> Result<&str, ChannelUrlError> {
    if segment.is_empty() || segment.len() > 100 {
        return Err(ChannelUrlError::MalformedReference);
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ChannelUrlError::MalformedReference);
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_channel_url() {
        let got = parse_channel_url("https://www.youtube.com/channel/UCabcdef123456").unwrap();
        assert_eq!(got, ChannelRef::Id("UCabcdef123456".to_string()));
    }

    #[test]
    fn parses_handle_url_with_query() {
        let got = parse_channel_url("https://youtube.com/@SleepyHistory?sub_confirmation=1").unwrap();
        assert_eq!(got, ChannelRef::Handle("SleepyHistory".to_string()));
    }

    #[test]
    fn parses_bare_handle() {
        let got = parse_channel_url("@SleepyHistory").unwrap();
        assert_eq!(got, ChannelRef::Handle("SleepyHistory".to_string()));
    }

    #[test]
    fn parses_custom_and_user_urls() {
        assert_eq!(
            parse_channel_url("https://youtube.com/c/SleepyHistory").unwrap(),
            ChannelRef::Custom("SleepyHistory".to_string())
        );
        assert_eq!(
            parse_channel_url("https://youtube.com/user/sleepyhistory99/videos").unwrap(),
            ChannelRef::User("sleepyhistory99".to_string())
        );
    }

    #[test]
    fn rejects_non_youtube() {
        assert_eq!(
            parse_channel_url("https://vimeo.com/channel/UCabc"),
            Err(ChannelUrlError::NotYoutube)
        );
    }

    #[test]
    fn rejects_video_urls() {
        assert_eq!(
            parse_channel_url("https://youtube.com/watch?v=dQw4w9WgXcQ"),
            Err(ChannelUrlError::NotAChannel)
        );
    }

    #[test]
    fn rejects_malformed_channel_id() {
        assert!(parse_channel_url("https://youtube.com/channel/xyz").is_err());
        assert!(parse_channel_url("https://youtube.com/@bad handle").is_err());
        assert!(parse_channel_url("").is_err());
    }
}
