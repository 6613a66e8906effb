//! Ordered fallback over transcript strategies.

use super::normalize::{self, char_len, truncate_for_analysis};
use super::{
    AudioTranscriptionStrategy, CaptionsStrategy, SubtitleStrategy, TranscriptSource,
    TranscriptStrategy, WebhookStrategy,
};
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::transcription::SpeechToText;
use crate::video_id::VideoId;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Suggestion attached to [`TubelensError::NoCaptionsAvailable`].
pub const NO_CAPTIONS_SUGGESTION: &str =
    "This video may not have captions available. Try uploading the audio file directly instead.";

/// A normalized transcript and the strategy that produced it.
#[derive(Debug, Clone)]
pub struct AcquiredTranscript {
    pub text: String,
    pub source: TranscriptSource,
}

impl AcquiredTranscript {
    /// Untruncated length in characters.
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    /// The text to forward to analysis, truncated to `max_chars` if needed.
    pub fn for_analysis(&self, max_chars: usize) -> Cow<'_, str> {
        truncate_for_analysis(&self.text, max_chars)
    }
}

/// Tries transcript strategies one at a time, in order, until one yields text.
pub struct FallbackChain {
    strategies: Vec<Arc<dyn TranscriptStrategy>>,
}

impl FallbackChain {
    pub fn new(strategies: Vec<Arc<dyn TranscriptStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the chain declared in `transcript.strategies`.
    pub fn from_settings(settings: &Settings, speech: Arc<dyn SpeechToText>) -> Result<Self> {
        let mut strategies: Vec<Arc<dyn TranscriptStrategy>> = Vec::new();

        for source in &settings.transcript.strategies {
            let strategy: Arc<dyn TranscriptStrategy> = match source {
                TranscriptSource::Captions => Arc::new(CaptionsStrategy::from_settings(settings)?),
                TranscriptSource::FallbackApi => Arc::new(WebhookStrategy::from_settings(settings)?),
                TranscriptSource::SubtitleDownload => {
                    Arc::new(SubtitleStrategy::from_settings(settings))
                }
                TranscriptSource::AudioTranscription => Arc::new(
                    AudioTranscriptionStrategy::from_settings(settings, speech.clone()),
                ),
                TranscriptSource::AudioUpload => {
                    return Err(TubelensError::Config(
                        "audio-upload is not a transcript strategy; remove it from transcript.strategies"
                            .to_string(),
                    ));
                }
            };

            if strategies.iter().any(|s| s.source() == *source) {
                return Err(TubelensError::Config(format!(
                    "transcript strategy '{}' is listed more than once",
                    source
                )));
            }
            strategies.push(strategy);
        }

        Ok(Self::new(strategies))
    }

    /// Configured strategy order.
    pub fn sources(&self) -> Vec<TranscriptSource> {
        self.strategies.iter().map(|s| s.source()).collect()
    }

    /// Obtain a normalized transcript for `video`.
    ///
    /// Each strategy is attempted at most once. A failure or an empty result
    /// moves on to the next strategy; only when all are exhausted does this
    /// return [`TubelensError::NoCaptionsAvailable`].
    #[instrument(skip(self, source_url), fields(video_id = %video))]
    pub async fn acquire(&self, video: &VideoId, source_url: &str) -> Result<AcquiredTranscript> {
        let mut last_failure: Option<String> = None;
        let mut last_skip: Option<String> = None;

        for strategy in &self.strategies {
            let source = strategy.source();

            if let Some(reason) = strategy.unavailable_reason() {
                info!("Skipping {}: {}", source, reason);
                last_skip = Some(format!("{} skipped: {}", source, reason));
                continue;
            }

            info!("Trying {}", source);
            match self.attempt(strategy.as_ref(), video, source_url).await {
                Ok(text) => {
                    info!("Transcript obtained via {} ({} chars)", source, char_len(&text));
                    return Ok(AcquiredTranscript { text, source });
                }
                Err(e) => {
                    warn!("{}", e);
                    last_failure = Some(e.to_string());
                }
            }
        }

        let details = last_failure
            .or(last_skip)
            .unwrap_or_else(|| "no transcript strategies are configured".to_string());

        Err(TubelensError::NoCaptionsAvailable {
            suggestion: NO_CAPTIONS_SUGGESTION.to_string(),
            details,
        })
    }

    async fn attempt(
        &self,
        strategy: &dyn TranscriptStrategy,
        video: &VideoId,
        source_url: &str,
    ) -> Result<String> {
        let source = strategy.source();
        let raw = strategy.fetch(video, source_url).await.map_err(|e| match e {
            TubelensError::Strategy { .. } => e,
            other => TubelensError::Strategy {
                strategy: source,
                message: other.to_string(),
            },
        })?;

        let text = normalize::normalize(&raw);
        if text.is_empty() {
            return Err(TubelensError::Strategy {
                strategy: source,
                message: "returned an empty transcript".to_string(),
            });
        }

        Ok(text)
    }
}
