//! Error types for Tubelens.

use crate::transcript::TranscriptSource;
use thiserror::Error;

/// Library-level error type for Tubelens operations.
#[derive(Error, Debug)]
pub enum TubelensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single acquisition strategy failed. The fallback chain recovers from these.
    #[error("{strategy} failed: {message}")]
    Strategy {
        strategy: TranscriptSource,
        message: String,
    },

    /// Every configured transcript strategy was exhausted.
    #[error("No captions available: {details}")]
    NoCaptionsAvailable { suggestion: String, details: String },

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}

impl TubelensError {
    /// Whether the error was caused by what the caller submitted rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TubelensError::InvalidInput(_) | TubelensError::NoCaptionsAvailable { .. }
        )
    }
}

/// Result type alias for Tubelens operations.
pub type Result<T> = std::result::Result<T, TubelensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(TubelensError::InvalidInput("x".into()).is_client_error());
        assert!(TubelensError::NoCaptionsAvailable {
            suggestion: "upload".into(),
            details: "none".into(),
        }
        .is_client_error());
        assert!(!TubelensError::Analysis("boom".into()).is_client_error());
    }

    #[test]
    fn test_strategy_error_message() {
        let err = TubelensError::Strategy {
            strategy: TranscriptSource::FallbackApi,
            message: "timed out".into(),
        };
        assert_eq!(err.to_string(), "fallback-api failed: timed out");
    }
}
