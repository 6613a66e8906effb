//! YouTube video identifier extraction.

use crate::error::{Result, TubelensError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Length of a canonical YouTube video ID.
pub const VIDEO_ID_LEN: usize = 11;

/// Matchers in priority order. URL shapes come before the bare-ID fallback so
/// that an 11-character run inside a URL is never mistaken for a bare ID.
fn patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                "watch",
                r"^(?:https?://)?(?:(?:www|m|music)\.)?youtube\.com/watch/?\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]{11})(?:[&#]|$)",
            ),
            (
                "short-link",
                r"^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})(?:[?&#/]|$)",
            ),
            (
                "embed",
                r"^(?:https?://)?(?:(?:www|m)\.)?(?:youtube\.com|youtube-nocookie\.com)/(?:embed|v|shorts)/([A-Za-z0-9_-]{11})(?:[?&#/]|$)",
            ),
            ("bare", r"^([A-Za-z0-9_-]{11})$"),
        ]
        .into_iter()
        .map(|(name, pattern)| (name, Regex::new(pattern).expect("Invalid regex")))
        .collect()
    })
}

/// A canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extract a video ID from a watch URL, short link, embed URL or bare ID.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        for (name, pattern) in patterns() {
            if let Some(id) = pattern.captures(input).and_then(|caps| caps.get(1)) {
                tracing::debug!("Matched {} pattern", name);
                return Ok(Self(id.as_str().to_string()));
            }
        }

        Err(TubelensError::InvalidInput(format!(
            "Invalid YouTube URL or video ID: {}",
            input
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// URL to hand to strategies that need one: the caller's own URL when they
    /// supplied one, otherwise the canonical watch URL.
    pub fn source_url(&self, input: &str) -> String {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            self.watch_url()
        }
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_all_url_shapes_yield_same_id() {
        let inputs = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?start=10",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ];

        for input in inputs {
            let id = VideoId::parse(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(id.as_str(), ID, "input: {input}");
        }
    }

    #[test]
    fn test_bare_id_only_when_whole_input() {
        assert_eq!(VideoId::parse("abcDEF_-123").unwrap().as_str(), "abcDEF_-123");
        // An 11-character run inside longer text is not an ID.
        assert!(VideoId::parse("xdQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("dQw4w9WgXc").is_err());
    }

    #[test]
    fn test_url_pattern_takes_priority_over_bare_id() {
        // The path segment is a valid bare-ID shape, but the URL pattern wins and
        // extracts the `v` parameter instead.
        let id = VideoId::parse("https://youtube.com/watch?v=AAAAAAAAAAA").unwrap();
        assert_eq!(id.as_str(), "AAAAAAAAAAA");
    }

    #[test]
    fn test_invalid_inputs() {
        for input in [
            "",
            "not a url",
            "https://vimeo.com/123456789",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQextra",
            "https://youtube.com/playlist?list=PLtest",
        ] {
            let err = VideoId::parse(input).unwrap_err();
            assert!(matches!(err, TubelensError::InvalidInput(_)), "input: {input}");
        }
    }

    #[test]
    fn test_source_url() {
        let id = VideoId::parse(ID).unwrap();
        assert_eq!(id.source_url(ID), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            id.source_url("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }
}
