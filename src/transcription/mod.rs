//! Speech-to-text for Tubelens.
//!
//! Used by the `audio-transcription` fallback strategy and by audio uploads.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for hosted speech-to-text services.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Why the service cannot be used (e.g. missing credentials), if it cannot.
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    /// Transcribe an audio file to plain text.
    ///
    /// `scratch_dir` receives any intermediate files (audio segments) and is
    /// owned by the caller.
    async fn transcribe(&self, audio_path: &Path, scratch_dir: &Path) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TubelensError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned speech-to-text for tests.
    pub(crate) struct MockSpeech {
        text: Option<String>,
        unavailable: Option<String>,
        calls: AtomicUsize,
    }

    impl MockSpeech {
        pub(crate) fn text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                unavailable: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                text: None,
                unavailable: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn unavailable(reason: &str) -> Self {
            Self {
                text: None,
                unavailable: Some(reason.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechToText for MockSpeech {
        fn unavailable_reason(&self) -> Option<String> {
            self.unavailable.clone()
        }

        async fn transcribe(&self, audio_path: &Path, _scratch_dir: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(audio_path.exists(), "audio file should exist while transcribing");
            self.text
                .clone()
                .ok_or_else(|| TubelensError::Transcription("service error".to_string()))
        }
    }
}
