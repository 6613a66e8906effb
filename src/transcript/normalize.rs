//! Transcript normalization and truncation.
//!
//! Every strategy's raw text passes through [`normalize`] so the analysis
//! stage always sees the same canonical plain-text form.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Appended to transcripts cut down to the analysis length limit.
pub const TRUNCATION_MARKER: &str = "\n\n[Transcript truncated due to length...]";

/// Caption payloads are often entity-encoded twice.
const MAX_DECODE_PASSES: usize = 2;

/// Non-speech filler symbol used by auto-generated captions.
const MUSIC_NOTE: char = '♪';

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("Invalid regex"))
}

fn bracket_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("Invalid regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"))
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

/// Decode one layer of HTML entities. Unknown entities are left untouched.
pub fn decode_entities_once(text: &str) -> Cow<'_, str> {
    entity_regex().replace_all(text, |caps: &Captures| match decode_entity(&caps[1]) {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    })
}

/// Decode HTML entities until a pass changes nothing, up to [`MAX_DECODE_PASSES`].
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let decoded = decode_entities_once(&current);
        if decoded == current {
            break;
        }
        current = decoded.into_owned();
    }
    current
}

/// Turn raw extracted text into the canonical transcript form.
pub fn normalize(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let without_annotations = bracket_regex().replace_all(&decoded, " ");
    let without_notes = without_annotations.replace(MUSIC_NOTE, " ");
    whitespace_regex()
        .replace_all(&without_notes, " ")
        .trim()
        .to_string()
}

/// Length of a transcript in characters, as reported to callers.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cut a transcript to `max_chars` characters and append [`TRUNCATION_MARKER`].
///
/// Returns the input unchanged when it already fits.
pub fn truncate_for_analysis(transcript: &str, max_chars: usize) -> Cow<'_, str> {
    match transcript.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&transcript[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
        None => Cow::Borrowed(transcript),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_encoded_entities() {
        assert_eq!(decode_entities("AT&amp;amp;T"), "AT&T");
        assert_eq!(decode_entities("it&amp;#39;s"), "it's");
    }

    #[test]
    fn test_entity_forms() {
        assert_eq!(
            decode_entities("&lt;b&gt; &quot;hi&quot; &apos;x&#39; &#x27;y&#X27; caf&#233;"),
            "<b> \"hi\" 'x' 'y' café"
        );
        assert_eq!(decode_entities("&bogus; & done"), "&bogus; & done");
    }

    #[test]
    fn test_decoding_is_bounded() {
        // Three layers of encoding: only two are removed.
        assert_eq!(decode_entities("&amp;amp;amp;"), "&amp;");
    }

    #[test]
    fn test_strips_bracketed_annotations() {
        assert_eq!(normalize("Hello [Music] world"), "Hello world");
        assert_eq!(normalize("[Applause] thanks [Laughter]"), "thanks");
        assert_eq!(normalize("&#91;Music&#93; intro"), "intro");
    }

    #[test]
    fn test_strips_music_notes_and_collapses_whitespace() {
        assert_eq!(normalize("  ♪ la la ♪\n\n  next\tline  "), "la la next line");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn test_truncation() {
        let transcript = "a".repeat(20_000);
        let truncated = truncate_for_analysis(&transcript, 15_000);

        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            char_len(&truncated),
            15_000 + char_len(TRUNCATION_MARKER)
        );
        assert_eq!(char_len(&transcript), 20_000);
    }

    #[test]
    fn test_no_truncation_when_within_limit() {
        let transcript = "a".repeat(15_000);
        assert!(matches!(
            truncate_for_analysis(&transcript, 15_000),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let transcript = "é".repeat(10);
        let truncated = truncate_for_analysis(&transcript, 3);
        assert_eq!(truncated, format!("ééé{}", TRUNCATION_MARKER));
    }
}
