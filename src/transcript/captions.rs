//! Direct caption-track retrieval from YouTube.
//!
//! Reads the InnerTube API key from the watch page, asks the player endpoint
//! for the caption track list, picks the best track for the preferred
//! languages and downloads its timed-text XML. Timing is discarded; only the
//! segment text is kept, in order.

use super::normalize::decode_entities_once;
use super::{TranscriptSource, TranscriptStrategy};
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::video_id::VideoId;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<(text|p)\b[^>]*>(.*?)</(?:text|p)>").expect("Invalid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex"))
}

fn api_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("Invalid regex")
    })
}

/// A caption track as listed by the player endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_language(&self, language: &str) -> bool {
        self.language_code.eq_ignore_ascii_case(language)
            || self
                .language_code
                .split('-')
                .next()
                .is_some_and(|base| base.eq_ignore_ascii_case(language))
    }
}

/// Pick a track: manual before generated for each preferred language, then
/// whatever track is listed first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for language in languages {
        let manual = tracks
            .iter()
            .find(|t| !t.is_generated() && t.matches_language(language));
        if let Some(track) = manual {
            return Some(track);
        }
        let generated = tracks
            .iter()
            .find(|t| t.is_generated() && t.matches_language(language));
        if let Some(track) = generated {
            return Some(track);
        }
    }
    tracks.first()
}

/// Extract segment texts from a timed-text document (`<text>` or srv3 `<p>` cues).
///
/// The XML layer of entities is decoded here so that encoded cue markup
/// (`&lt;i&gt;`) can be stripped too. Any further layers are left for
/// normalization.
pub fn parse_caption_track(xml: &str) -> Vec<String> {
    segment_regex()
        .captures_iter(xml)
        .map(|caps| {
            let text = tag_regex().replace_all(&caps[2], "");
            let decoded = decode_entities_once(&text);
            tag_regex().replace_all(&decoded, "").into_owned()
        })
        .collect()
}

/// Concatenate segment texts with single spaces.
pub fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetches the platform's own caption track.
pub struct CaptionsStrategy {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl CaptionsStrategy {
    pub fn new(languages: Vec<String>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36")
            .build()
            .map_err(|e| TubelensError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, languages })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.transcript.languages.clone(),
            Duration::from_secs(settings.transcript.captions_timeout_secs),
        )
    }

    async fn fetch_watch_page(&self, video: &VideoId) -> Result<String> {
        let response = self
            .client
            .get(format!("{}{}", WATCH_URL, video))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    fn extract_api_key(html: &str) -> Result<String> {
        if html.contains("g-recaptcha") {
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::Captions,
                message: "request blocked by a captcha".to_string(),
            });
        }

        api_key_regex()
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| TubelensError::Strategy {
                strategy: TranscriptSource::Captions,
                message: "could not find the player API key in the watch page".to_string(),
            })
    }

    async fn fetch_player(&self, video: &VideoId, api_key: &str) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video.as_str()
        });

        let response = self
            .client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    fn caption_tracks(player: &serde_json::Value) -> Result<Vec<CaptionTrack>> {
        let status = player
            .pointer("/playabilityStatus/status")
            .and_then(|s| s.as_str())
            .unwrap_or("OK");
        if status != "OK" {
            let reason = player
                .pointer("/playabilityStatus/reason")
                .and_then(|s| s.as_str())
                .unwrap_or("no reason given");
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::Captions,
                message: format!("video is not playable ({}): {}", status, reason),
            });
        }

        let tracks = player
            .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
            .cloned()
            .map(serde_json::from_value::<Vec<CaptionTrack>>)
            .transpose()?
            .unwrap_or_default();

        if tracks.is_empty() {
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::Captions,
                message: "captions are disabled for this video".to_string(),
            });
        }

        Ok(tracks)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<String>> {
        if track.base_url.contains("&exp=xpe") {
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::Captions,
                message: "caption track requires a proof-of-origin token".to_string(),
            });
        }

        let url = track.base_url.replace("&fmt=srv3", "");
        let xml = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_caption_track(&xml))
    }
}

#[async_trait]
impl TranscriptStrategy for CaptionsStrategy {
    fn source(&self) -> TranscriptSource {
        TranscriptSource::Captions
    }

    #[instrument(skip(self, _source_url), fields(video_id = %video))]
    async fn fetch(&self, video: &VideoId, _source_url: &str) -> Result<String> {
        let html = self.fetch_watch_page(video).await?;
        let api_key = Self::extract_api_key(&html)?;
        let player = self.fetch_player(video, &api_key).await?;
        let tracks = Self::caption_tracks(&player)?;

        let track = select_track(&tracks, &self.languages).ok_or_else(|| TubelensError::Strategy {
            strategy: TranscriptSource::Captions,
            message: "no caption track available".to_string(),
        })?;
        debug!(
            "Using {} caption track ({})",
            track.language_code,
            if track.is_generated() { "auto-generated" } else { "manual" }
        );

        let segments = self.fetch_track(track).await?;
        debug!("Fetched {} caption segments", segments.len());

        Ok(join_segments(&segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::normalize::normalize;

    fn track(code: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.com/{}", code),
            language_code: code.to_string(),
            kind: kind.map(|k| k.to_string()),
        }
    }

    #[test]
    fn test_parse_timedtext_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.5" dur="1.2">Hello &amp;amp; welcome</text>
<text start="1.7" dur="2.0">to the
show</text>
<text start="3.7" dur="0.5"></text>
</transcript>"#;

        let segments = parse_caption_track(xml);
        assert_eq!(segments, vec!["Hello &amp; welcome", "to the\nshow", ""]);
        assert_eq!(join_segments(&segments), "Hello &amp; welcome to the\nshow");
        assert_eq!(normalize(&join_segments(&segments)), "Hello & welcome to the show");
    }

    #[test]
    fn test_parse_strips_encoded_markup() {
        let xml = r#"<transcript><text start="0" dur="1">&lt;i&gt;hello&lt;/i&gt;</text><text start="1" dur="1">there</text></transcript>"#;

        let segments = parse_caption_track(xml);
        assert_eq!(segments, vec!["hello", "there"]);
        assert_eq!(normalize(&join_segments(&segments)), "hello there");
    }

    #[test]
    fn test_parse_srv3_xml() {
        let xml = r#"<timedtext format="3"><body>
<p t="0" d="1500"><s ac="0">never</s><s t="400"> gonna</s></p>
<p t="1500" d="900">give you up</p>
</body></timedtext>"#;

        assert_eq!(parse_caption_track(xml), vec!["never gonna", "give you up"]);
    }

    #[test]
    fn test_join_whitespace_segments_is_empty() {
        let segments = vec![String::new(), " ".to_string()];
        assert_eq!(join_segments(&segments), "");
    }

    #[test]
    fn test_select_track_prefers_manual_then_generated() {
        let tracks = vec![
            track("de", None),
            track("en", Some("asr")),
            track("en-GB", None),
        ];
        let langs = vec!["en".to_string()];
        assert_eq!(select_track(&tracks, &langs).unwrap().language_code, "en-GB");

        let tracks = vec![track("de", None), track("en", Some("asr"))];
        assert_eq!(select_track(&tracks, &langs).unwrap().language_code, "en");

        let tracks = vec![track("fr", None)];
        assert_eq!(select_track(&tracks, &langs).unwrap().language_code, "fr");
        assert!(select_track(&[], &langs).is_none());
    }

    #[test]
    fn test_extract_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyTest_key-123"})</script>"#;
        assert_eq!(
            CaptionsStrategy::extract_api_key(html).unwrap(),
            "AIzaSyTest_key-123"
        );
        assert!(CaptionsStrategy::extract_api_key("<html></html>").is_err());
        assert!(CaptionsStrategy::extract_api_key(r#"<div class="g-recaptcha">"#).is_err());
    }

    #[test]
    fn test_caption_tracks_from_player_response() {
        let player = serde_json::json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        { "baseUrl": "https://example.com/a", "languageCode": "en", "kind": "asr" }
                    ]
                }
            }
        });
        let tracks = CaptionsStrategy::caption_tracks(&player).unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].is_generated());

        let disabled = serde_json::json!({ "playabilityStatus": { "status": "OK" } });
        assert!(CaptionsStrategy::caption_tracks(&disabled).is_err());

        let unplayable = serde_json::json!({
            "playabilityStatus": { "status": "LOGIN_REQUIRED", "reason": "Sign in" }
        });
        let err = CaptionsStrategy::caption_tracks(&unplayable).unwrap_err();
        assert!(err.to_string().contains("LOGIN_REQUIRED"));
    }
}
