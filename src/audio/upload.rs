//! Validation and staging of uploaded audio files.

use crate::config::UploadSettings;
use crate::error::{Result, TubelensError};
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted when the declared content type is missing or generic.
const UPLOAD_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "mp4", "webm", "ogg", "flac"];

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// An audio file received from a client, held in memory.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl AudioUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a local file, leaving the type to be decided by its extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TubelensError::InvalidInput(format!("Not a file: {}", path.display())))?
            .to_string();
        Ok(Self::new(file_name, None, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Which uploads are accepted.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    accepted_types: Vec<String>,
    max_bytes: u64,
}

impl UploadPolicy {
    pub fn new(accepted_types: Vec<String>, max_bytes: u64) -> Self {
        Self {
            accepted_types: accepted_types
                .into_iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            max_bytes,
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(settings.accepted_types.clone(), settings.max_bytes())
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check an upload's declared type, name and size.
    pub fn validate(&self, file_name: &str, content_type: Option<&str>, size: u64) -> Result<()> {
        if size == 0 {
            return Err(TubelensError::InvalidInput("Uploaded file is empty".to_string()));
        }

        if size > self.max_bytes {
            return Err(TubelensError::InvalidInput(format!(
                "File too large: {} bytes (maximum is {} MB)",
                size,
                self.max_bytes / (1024 * 1024)
            )));
        }

        // Parameters such as "; codecs=opus" don't affect acceptance
        let declared = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != GENERIC_CONTENT_TYPE);

        let accepted = match declared {
            Some(ct) => self.accepted_types.contains(&ct),
            None => has_upload_extension(file_name),
        };

        if !accepted {
            return Err(TubelensError::InvalidInput(format!(
                "Unsupported file type for '{}'. Please upload an audio file (MP3, WAV, M4A, MP4, WEBM, OGG or FLAC)",
                file_name
            )));
        }

        Ok(())
    }

    /// Write a validated upload into `dir`, returning its path.
    pub async fn persist(&self, upload: &AudioUpload, dir: &Path) -> Result<PathBuf> {
        self.validate(&upload.file_name, upload.content_type.as_deref(), upload.size())?;

        let path = dir.join(sanitize_file_name(&upload.file_name));
        tokio::fs::write(&path, &upload.bytes).await?;
        debug!("Stored upload at {}", path.display());
        Ok(path)
    }
}

fn has_upload_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| UPLOAD_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduce a client-supplied name to a safe single path component.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload.audio".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy::from_settings(&UploadSettings::default())
    }

    #[test]
    fn test_upload_shares_received_buffer() {
        let body = Bytes::from(vec![7u8; 4096]);
        let upload = AudioUpload::new("talk.mp3", Some("audio/mpeg".into()), body.clone());
        assert_eq!(upload.bytes.as_ptr(), body.as_ptr());
        assert_eq!(upload.size(), 4096);
    }

    #[test]
    fn test_accepts_declared_audio_types() {
        let policy = policy();
        assert!(policy.validate("talk.mp3", Some("audio/mpeg"), 1024).is_ok());
        assert!(policy.validate("clip", Some("video/webm; codecs=opus"), 1024).is_ok());
        assert!(policy.validate("memo.m4a", Some("Audio/X-M4A"), 1024).is_ok());
    }

    #[test]
    fn test_rejects_non_audio_types() {
        let err = policy()
            .validate("notes.pdf", Some("application/pdf"), 1024)
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_generic_type_falls_back_to_extension() {
        let policy = policy();
        assert!(policy
            .validate("episode.FLAC", Some("application/octet-stream"), 10)
            .is_ok());
        assert!(policy.validate("episode.ogg", None, 10).is_ok());
        assert!(policy.validate("episode.exe", None, 10).is_err());
        assert!(policy.validate("episode", Some(""), 10).is_err());
    }

    #[test]
    fn test_size_limits() {
        let policy = UploadPolicy::new(vec!["audio/mpeg".into()], 1024 * 1024);
        let empty = policy.validate("a.mp3", Some("audio/mpeg"), 0).unwrap_err();
        assert!(empty.to_string().contains("empty"));

        let large = policy
            .validate("a.mp3", Some("audio/mpeg"), 1024 * 1024 + 1)
            .unwrap_err();
        assert!(large.to_string().contains("maximum is 1 MB"));

        assert!(policy.validate("a.mp3", Some("audio/mpeg"), 1024 * 1024).is_ok());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\music\\my song.mp3"), "my_song.mp3");
        assert_eq!(sanitize_file_name(".hidden.wav"), "hidden.wav");
        assert_eq!(sanitize_file_name(""), "upload.audio");
    }

    #[tokio::test]
    async fn test_persist_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let upload = AudioUpload::new("../talk.mp3", Some("audio/mpeg".into()), b"ID3".to_vec());

        let path = policy().persist(&upload, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("talk.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn test_from_path_leaves_type_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let upload = AudioUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "memo.wav");
        assert!(upload.content_type.is_none());
        assert_eq!(upload.size(), 4);
    }
}
