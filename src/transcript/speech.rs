//! Hosted speech-to-text on the video's audio track.

use super::{TranscriptSource, TranscriptStrategy};
use crate::audio::download_audio;
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::transcription::SpeechToText;
use crate::video_id::VideoId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Downloads the audio track and submits it to a speech-to-text service.
pub struct AudioTranscriptionStrategy {
    downloader: Vec<String>,
    transcriber: Arc<dyn SpeechToText>,
    download_timeout: Duration,
    temp_root: PathBuf,
}

impl AudioTranscriptionStrategy {
    pub fn new(
        downloader: Vec<String>,
        transcriber: Arc<dyn SpeechToText>,
        download_timeout: Duration,
        temp_root: PathBuf,
    ) -> Self {
        Self {
            downloader,
            transcriber,
            download_timeout,
            temp_root,
        }
    }

    pub fn from_settings(settings: &Settings, transcriber: Arc<dyn SpeechToText>) -> Self {
        Self::new(
            settings.subtitles.command.clone(),
            transcriber,
            Duration::from_secs(settings.speech.download_timeout_secs),
            settings.temp_dir(),
        )
    }
}

#[async_trait]
impl TranscriptStrategy for AudioTranscriptionStrategy {
    fn source(&self) -> TranscriptSource {
        TranscriptSource::AudioTranscription
    }

    fn unavailable_reason(&self) -> Option<String> {
        if self.downloader.is_empty() {
            return Some("no audio downloader command configured".to_string());
        }
        self.transcriber.unavailable_reason()
    }

    #[instrument(skip(self, source_url), fields(video_id = %video))]
    async fn fetch(&self, video: &VideoId, source_url: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.temp_root).await?;
        let workdir = tempfile::Builder::new()
            .prefix(&format!("audio-{}-", video))
            .tempdir_in(&self.temp_root)?;

        let audio_path = download_audio(
            &self.downloader,
            source_url,
            video.as_str(),
            workdir.path(),
            self.download_timeout,
        )
        .await?;

        info!("Submitting audio for transcription");
        let text = self.transcriber.transcribe(&audio_path, workdir.path()).await?;

        if text.trim().is_empty() {
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::AudioTranscription,
                message: "speech-to-text returned no text".to_string(),
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::tests::MockSpeech;

    #[test]
    fn test_unavailable_follows_transcriber() {
        let strategy = AudioTranscriptionStrategy::new(
            vec!["yt-dlp".into()],
            Arc::new(MockSpeech::unavailable("OPENAI_API_KEY is not set")),
            Duration::from_secs(1),
            PathBuf::from("/tmp"),
        );
        assert_eq!(
            strategy.unavailable_reason().as_deref(),
            Some("OPENAI_API_KEY is not set")
        );

        let strategy = AudioTranscriptionStrategy::new(
            vec![],
            Arc::new(MockSpeech::text("hi")),
            Duration::from_secs(1),
            PathBuf::from("/tmp"),
        );
        assert!(strategy.unavailable_reason().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_downloads_then_transcribes_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let script = r#"
            while [ $# -gt 0 ]; do
                if [ "$1" = "--output" ]; then out="$2"; fi
                shift
            done
            echo fake-audio > "$(dirname "$out")/dQw4w9WgXcQ.mp3"
        "#;
        let speech = Arc::new(MockSpeech::text("transcribed speech"));
        let strategy = AudioTranscriptionStrategy::new(
            vec!["sh".into(), "-c".into(), script.into(), "sh".into()],
            speech.clone(),
            Duration::from_secs(10),
            root.path().to_path_buf(),
        );

        let video = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let text = strategy.fetch(&video, &video.watch_url()).await.unwrap();

        assert_eq!(text, "transcribed speech");
        assert_eq!(speech.call_count(), 1);
        assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
    }
}
