//! Subtitle download via a command-line downloader (yt-dlp).
//!
//! Subtitles are written into a private temporary directory that is removed
//! when the attempt ends, whether it succeeded or not.

use super::{TranscriptSource, TranscriptStrategy};
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::video_id::VideoId;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

const SUBTITLE_EXTENSIONS: &[&str] = &["vtt", "srt"];

fn inline_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

/// Reduce a WebVTT or SRT document to its spoken text.
///
/// Drops the WebVTT header block, cue numbers, timestamp lines and inline
/// cue tags. Auto-generated tracks repeat each line as it scrolls, so
/// consecutive duplicates are collapsed.
pub fn subtitle_to_text(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_header = false;
    let mut raw_lines = content.lines().peekable();

    while let Some(raw) = raw_lines.next() {
        let line = raw.trim().trim_start_matches('\u{feff}');

        if line.starts_with("WEBVTT") {
            in_header = true;
            continue;
        }
        if line.is_empty() {
            in_header = false;
            continue;
        }
        if in_header || line.starts_with("NOTE") || line.starts_with("STYLE") {
            continue;
        }
        if line.contains("-->") {
            continue;
        }
        // A cue identifier sits directly above its timing line.
        let is_cue_number = line.chars().all(|c| c.is_ascii_digit())
            && raw_lines.peek().is_some_and(|next| next.contains("-->"));
        if is_cue_number {
            continue;
        }

        let text = inline_tag_regex().replace_all(line, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if lines.last().is_some_and(|prev| prev == text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join(" ")
}

/// Locate the subtitle file the downloader produced.
async fn find_subtitle_file(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_subtitle = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SUBTITLE_EXTENSIONS.contains(&ext));
        if is_subtitle {
            candidates.push(path);
        }
    }
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| TubelensError::Strategy {
        strategy: TranscriptSource::SubtitleDownload,
        message: "downloader produced no subtitle file".to_string(),
    })
}

/// Fetches auto-generated or uploaded subtitles with an external downloader.
pub struct SubtitleStrategy {
    command: Vec<String>,
    languages: Vec<String>,
    timeout: Duration,
    temp_root: PathBuf,
}

impl SubtitleStrategy {
    pub fn new(
        command: Vec<String>,
        languages: Vec<String>,
        timeout: Duration,
        temp_root: PathBuf,
    ) -> Self {
        Self {
            command,
            languages,
            timeout,
            temp_root,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.subtitles.command.clone(),
            settings.transcript.languages.clone(),
            Duration::from_secs(settings.subtitles.timeout_secs),
            settings.temp_dir(),
        )
    }

    fn language_arg(&self) -> String {
        if self.languages.is_empty() {
            "en.*".to_string()
        } else {
            self.languages
                .iter()
                .map(|l| format!("{}.*", l))
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    async fn download(&self, source_url: &str, workdir: &Path) -> Result<()> {
        let (program, leading_args) = self
            .command
            .split_first()
            .ok_or_else(|| TubelensError::Config("subtitles.command is empty".to_string()))?;

        let template = workdir.join("%(id)s.%(ext)s");

        let mut command = Command::new(program);
        command
            .args(leading_args)
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(self.language_arg())
            .arg("--sub-format").arg("vtt/srt/best")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("-o").arg(&template)
            .arg(source_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(TubelensError::Timeout(format!(
                    "{} did not finish within {}s",
                    program,
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TubelensError::ToolNotFound(program.clone()));
            }
            Ok(Err(e)) => {
                return Err(TubelensError::ToolFailed(format!("{} execution failed: {}", program, e)));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubelensError::ToolFailed(format!(
                "{} failed: {}",
                program,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl TranscriptStrategy for SubtitleStrategy {
    fn source(&self) -> TranscriptSource {
        TranscriptSource::SubtitleDownload
    }

    fn unavailable_reason(&self) -> Option<String> {
        if self.command.is_empty() {
            Some("no subtitle downloader command configured".to_string())
        } else {
            None
        }
    }

    #[instrument(skip(self, source_url), fields(video_id = %video))]
    async fn fetch(&self, video: &VideoId, source_url: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.temp_root).await?;
        // Removed on drop, on every exit path below.
        let workdir = tempfile::Builder::new()
            .prefix(&format!("subs-{}-", video))
            .tempdir_in(&self.temp_root)?;

        self.download(source_url, workdir.path()).await?;

        let path = find_subtitle_file(workdir.path()).await?;
        debug!("Reading subtitles from {}", path.display());
        let content = tokio::fs::read_to_string(&path).await?;

        let text = subtitle_to_text(&content);
        if text.is_empty() {
            return Err(TubelensError::Strategy {
                strategy: TranscriptSource::SubtitleDownload,
                message: format!("could not parse subtitle file {}", path.display()),
            });
        }

        Ok(text)
    }
}
