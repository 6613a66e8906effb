//! Tubelens - transcripts and AI analysis for YouTube videos
//!
//! Given a YouTube URL (or bare video ID) or an uploaded audio file, Tubelens
//! obtains a transcript and asks a language model for a structured analysis
//! of the spoken content.
//!
//! # Architecture
//!
//! - `video_id` - Identifier extraction from watch, short-link and embed URLs
//! - `transcript` - Transcript strategies, the fallback chain and normalization
//! - `transcription` - Hosted speech-to-text
//! - `audio` - Audio download, splitting and upload validation
//! - `analysis` - LLM completion
//! - `pipeline` - Request coordination
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use tubelens::config::Settings;
//! use tubelens::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let result = pipeline.analyze_video("https://youtu.be/dQw4w9WgXcQ").await?;
//!     println!("{} ({} chars via {})", result.video_id, result.transcript_length, result.transcript_source);
//!     println!("{}", result.analysis);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod transcript;
pub mod transcription;
pub mod video_id;

pub use error::{Result, TubelensError};
pub use video_id::VideoId;
