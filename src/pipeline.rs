//! Request pipeline for Tubelens.
//!
//! Coordinates identifier extraction, transcript acquisition and analysis.

use crate::analysis::{Analyzer, OpenAIAnalyzer};
use crate::audio::{AudioUpload, UploadPolicy};
use crate::config::{Prompts, Settings};
use crate::error::{Result, TubelensError};
use crate::transcript::{normalize, AcquiredTranscript, FallbackChain, TranscriptSource};
use crate::transcription::{SpeechToText, WhisperTranscriber};
use crate::video_id::VideoId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Successful analysis of a video or upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Video identifier, or the file name for uploads.
    pub video_id: String,
    /// Length of the normalized transcript in characters, before truncation.
    pub transcript_length: usize,
    pub transcript_source: TranscriptSource,
    pub analysis: String,
}

/// A normalized transcript without analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub video_id: String,
    pub transcript_length: usize,
    pub transcript_source: TranscriptSource,
    pub transcript: String,
}

/// The main pipeline. One instance serves any number of independent requests.
pub struct Pipeline {
    settings: Settings,
    prompts: Prompts,
    chain: FallbackChain,
    analyzer: Arc<dyn Analyzer>,
    speech: Arc<dyn SpeechToText>,
    upload_policy: UploadPolicy,
    temp_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline with the configured strategies and OpenAI-backed services.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let speech: Arc<dyn SpeechToText> =
            Arc::new(WhisperTranscriber::from_settings(&settings.speech)?);
        let chain = FallbackChain::from_settings(&settings, speech.clone())?;
        let analyzer: Arc<dyn Analyzer> =
            Arc::new(OpenAIAnalyzer::from_settings(&settings.analysis)?);

        info!(
            "Transcript strategies: {}",
            chain
                .sources()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self::with_components(settings, prompts, chain, analyzer, speech))
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        chain: FallbackChain,
        analyzer: Arc<dyn Analyzer>,
        speech: Arc<dyn SpeechToText>,
    ) -> Self {
        let upload_policy = UploadPolicy::from_settings(&settings.upload);
        let temp_dir = settings.temp_dir();

        Self {
            settings,
            prompts,
            chain,
            analyzer,
            speech,
            upload_policy,
            temp_dir,
        }
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.upload_policy
    }

    /// Extract the identifier and run the fallback chain.
    async fn acquire(&self, input: &str) -> Result<(VideoId, AcquiredTranscript)> {
        let video = VideoId::parse(input)?;
        let source_url = video.source_url(input);
        let transcript = self.chain.acquire(&video, &source_url).await?;
        Ok((video, transcript))
    }

    /// Obtain the normalized, untruncated transcript of a video.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn fetch_transcript(&self, input: &str) -> Result<TranscriptResponse> {
        let (video, transcript) = self.acquire(input).await?;

        Ok(TranscriptResponse {
            video_id: video.to_string(),
            transcript_length: transcript.char_len(),
            transcript_source: transcript.source,
            transcript: transcript.text,
        })
    }

    /// Transcribe and analyze a video.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn analyze_video(&self, input: &str) -> Result<AnalysisResponse> {
        let (video, transcript) = self.acquire(input).await?;
        let analysis = self.analyze(video.as_str(), &transcript).await?;

        Ok(AnalysisResponse {
            video_id: video.to_string(),
            transcript_length: transcript.char_len(),
            transcript_source: transcript.source,
            analysis,
        })
    }

    /// Validate, transcribe and analyze an uploaded audio file.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.size()))]
    pub async fn analyze_upload(&self, upload: AudioUpload) -> Result<AnalysisResponse> {
        self.upload_policy.validate(
            &upload.file_name,
            upload.content_type.as_deref(),
            upload.size(),
        )?;

        if let Some(reason) = self.speech.unavailable_reason() {
            return Err(TubelensError::Transcription(reason));
        }

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let workdir = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(&self.temp_dir)?;

        let audio_path = self.upload_policy.persist(&upload, workdir.path()).await?;
        let file_name = upload.file_name;
        drop(upload.bytes);

        info!("Transcribing upload");
        let raw = self.speech.transcribe(&audio_path, workdir.path()).await?;
        drop(workdir);

        let text = normalize(&raw);
        if text.is_empty() {
            return Err(TubelensError::Transcription(
                "no speech was recognized in the uploaded file".to_string(),
            ));
        }

        let transcript = AcquiredTranscript {
            text,
            source: TranscriptSource::AudioUpload,
        };
        let analysis = self.analyze(&file_name, &transcript).await?;

        Ok(AnalysisResponse {
            video_id: file_name,
            transcript_length: transcript.char_len(),
            transcript_source: transcript.source,
            analysis,
        })
    }

    /// Run the single analysis completion on the (possibly truncated) transcript.
    async fn analyze(&self, label: &str, transcript: &AcquiredTranscript) -> Result<String> {
        let max_chars = self.settings.transcript.max_transcript_chars;
        let text = transcript.for_analysis(max_chars);
        if transcript.char_len() > max_chars {
            info!(
                "Transcript truncated from {} to {} characters for analysis",
                transcript.char_len(),
                max_chars
            );
        }

        let user = self.prompts.analysis_user_prompt(label, &text);
        self.analyzer.complete(&self.prompts.analysis.system, &user).await
    }
}
