//! Configuration module for Tubelens.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts};
pub use settings::{
    AnalysisSettings, GeneralSettings, PromptSettings, ServerSettings, Settings, SpeechSettings,
    SubtitleSettings, TranscriptSettings, UploadSettings, WebhookSettings, WEBHOOK_URL_ENV,
};
