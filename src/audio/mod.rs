//! Audio acquisition and processing.

mod downloader;
mod upload;

pub use downloader::{download_audio, split_audio};
pub use upload::{AudioUpload, UploadPolicy};
