//! OpenAI Whisper transcription implementation.

use super::SpeechToText;
use crate::audio::split_audio;
use crate::config::SpeechSettings;
use crate::error::{Result, TubelensError};
use crate::openai::{create_client, is_api_key_configured};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(
        model: &str,
        chunk_duration_seconds: u32,
        max_concurrent_chunks: usize,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            chunk_duration_seconds,
            max_concurrent_chunks: max_concurrent_chunks.max(1),
        })
    }

    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        Self::with_config(
            &settings.model,
            settings.chunk_duration_seconds,
            settings.max_concurrent_chunks,
        )
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| TubelensError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| TubelensError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    fn unavailable_reason(&self) -> Option<String> {
        if is_api_key_configured() {
            None
        } else {
            Some("OPENAI_API_KEY is not set".to_string())
        }
    }

    /// Transcribe an audio file, splitting it first when it is longer than one chunk.
    #[instrument(skip(self, scratch_dir), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, scratch_dir: &Path) -> Result<String> {
        let segments_dir = scratch_dir.join("segments");
        let chunks = split_audio(audio_path, &segments_dir, self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        let chunk_count = chunks.len();
        info!("Processing {} audio chunks with {}", chunk_count, self.model);

        // Process chunks concurrently, fail fast on the first error
        let mut results: Vec<(usize, String)> = Vec::with_capacity(chunk_count);

        let mut stream = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, (chunk_path, offset))| async move {
                let result = self.transcribe_single(&chunk_path).await;
                (idx, offset, result)
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, offset, result)) = stream.next().await {
            match result {
                Ok(text) => results.push((idx, text)),
                Err(e) => {
                    return Err(TubelensError::Transcription(format!(
                        "Chunk {} at {:.0}s failed: {}",
                        idx, offset, e
                    )));
                }
            }
        }

        results.sort_by_key(|(idx, _)| *idx);

        Ok(results
            .into_iter()
            .map(|(_, text)| text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }
}
