//! Transcript acquisition for Tubelens.
//!
//! A video's transcript is obtained by a [`FallbackChain`] of
//! [`TranscriptStrategy`] implementations, tried in their configured order:
//!
//! - **captions**: the platform's own caption track
//! - **fallback-api**: a hosted webhook bridging to a captions-scraping API
//! - **subtitle-download**: auto-generated subtitles fetched with yt-dlp
//! - **audio-transcription**: the video's audio sent to hosted speech-to-text
//!
//! Whatever text wins is passed through [`normalize`] before it is returned.

mod captions;
mod chain;
pub mod normalize;
mod speech;
mod subtitles;
mod webhook;

pub use captions::{join_segments, parse_caption_track, CaptionsStrategy};
pub use chain::{AcquiredTranscript, FallbackChain, NO_CAPTIONS_SUGGESTION};
pub use normalize::{normalize, truncate_for_analysis, TRUNCATION_MARKER};
pub use speech::AudioTranscriptionStrategy;
pub use subtitles::{subtitle_to_text, SubtitleStrategy};
pub use webhook::WebhookStrategy;

#[cfg(test)]
pub(crate) use chain::tests::{chain_of, MockStrategy};

use crate::error::Result;
use crate::video_id::VideoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptSource {
    Captions,
    FallbackApi,
    SubtitleDownload,
    AudioTranscription,
    /// A user-uploaded audio file. Never part of the fallback chain.
    AudioUpload,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Captions => "captions",
            TranscriptSource::FallbackApi => "fallback-api",
            TranscriptSource::SubtitleDownload => "subtitle-download",
            TranscriptSource::AudioTranscription => "audio-transcription",
            TranscriptSource::AudioUpload => "audio-upload",
        }
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TranscriptSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "captions" => Ok(TranscriptSource::Captions),
            "fallback-api" | "webhook" => Ok(TranscriptSource::FallbackApi),
            "subtitle-download" | "subtitles" => Ok(TranscriptSource::SubtitleDownload),
            "audio-transcription" | "speech" => Ok(TranscriptSource::AudioTranscription),
            "audio-upload" => Ok(TranscriptSource::AudioUpload),
            _ => Err(format!("Unknown transcript source: {}", s)),
        }
    }
}

/// One way of obtaining a video's transcript.
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// The tag reported when this strategy wins.
    fn source(&self) -> TranscriptSource;

    /// Why this strategy cannot run at all (missing credentials or configuration).
    ///
    /// The chain skips strategies that report a reason instead of attempting them.
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    /// Fetch the raw, unnormalized transcript text.
    async fn fetch(&self, video: &VideoId, source_url: &str) -> Result<String>;
}
