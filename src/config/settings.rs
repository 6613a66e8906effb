//! Configuration settings for Tubelens.

use crate::transcript::TranscriptSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides `webhook.url`.
pub const WEBHOOK_URL_ENV: &str = "TUBELENS_WEBHOOK_URL";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub webhook: WebhookSettings,
    pub subtitles: SubtitleSettings,
    pub speech: SpeechSettings,
    pub analysis: AnalysisSettings,
    pub upload: UploadSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (subtitle downloads, uploads, audio).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/tubelens".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Strategies to try, in order.
    pub strategies: Vec<TranscriptSource>,
    /// Transcripts longer than this many characters are truncated before analysis.
    pub max_transcript_chars: usize,
    /// Preferred caption/subtitle languages, most preferred first.
    pub languages: Vec<String>,
    /// Timeout for each captions HTTP request.
    pub captions_timeout_secs: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            strategies: vec![
                TranscriptSource::Captions,
                TranscriptSource::FallbackApi,
                TranscriptSource::SubtitleDownload,
                TranscriptSource::AudioTranscription,
            ],
            max_transcript_chars: 15_000,
            languages: vec!["en".to_string()],
            captions_timeout_secs: 30,
        }
    }
}

/// Bridged webhook settings (hosted workflow that queries a captions API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Webhook URL. The strategy is skipped when unset.
    pub url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
        }
    }
}

/// Command-line subtitle downloader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleSettings {
    /// Downloader command and any leading arguments (e.g. `["python3", "-m", "yt_dlp"]`).
    pub command: Vec<String>,
    /// Maximum time the downloader may run.
    pub timeout_secs: u64,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            command: vec!["yt-dlp".to_string()],
            timeout_secs: 120,
        }
    }
}

/// Hosted speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Transcription model.
    pub model: String,
    /// Audio longer than this is split before upload.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk uploads.
    pub max_concurrent_chunks: usize,
    /// Maximum time for downloading a video's audio track.
    pub download_timeout_secs: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 3,
            download_timeout_secs: 180,
        }
    }
}

/// Language-model analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Chat model used for the analysis.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

/// Audio upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Maximum upload size in megabytes.
    pub max_size_mb: u64,
    /// Accepted MIME types.
    pub accepted_types: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_size_mb: 500,
            accepted_types: [
                "audio/mpeg",
                "audio/mp3",
                "audio/wav",
                "audio/x-wav",
                "audio/wave",
                "audio/mp4",
                "audio/m4a",
                "audio/x-m4a",
                "audio/webm",
                "audio/ogg",
                "audio/flac",
                "video/mp4",
                "video/webm",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl UploadSettings {
    /// Maximum upload size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Wall-clock budget for a single analysis request.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 300,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                settings.webhook.url = Some(url.trim().to_string());
            }
        }

        Ok(settings)
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TubelensError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubelens")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_order() {
        let settings = Settings::default();
        assert_eq!(
            settings.transcript.strategies,
            vec![
                TranscriptSource::Captions,
                TranscriptSource::FallbackApi,
                TranscriptSource::SubtitleDownload,
                TranscriptSource::AudioTranscription,
            ]
        );
        assert_eq!(settings.transcript.max_transcript_chars, 15_000);
        assert_eq!(settings.webhook.timeout_secs, 30);
        assert_eq!(settings.upload.max_bytes(), 500 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [transcript]
            strategies = ["subtitle-download", "captions"]

            [analysis]
            model = "gpt-4.1"
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.transcript.strategies,
            vec![TranscriptSource::SubtitleDownload, TranscriptSource::Captions]
        );
        assert_eq!(settings.transcript.max_transcript_chars, 15_000);
        assert_eq!(settings.analysis.model, "gpt-4.1");
        assert_eq!(settings.subtitles.command, vec!["yt-dlp".to_string()]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 8080;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 8080);
    }
}
