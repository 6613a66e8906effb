//! Audio download and processing utilities.
//!
//! This module provides functions for downloading audio from URLs using yt-dlp
//! and processing audio files using ffmpeg.

use crate::error::{Result, TubelensError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Downloads the audio track of a URL into `output_dir` as MP3.
///
/// `command` is the downloader invocation (normally `["yt-dlp"]`); the
/// download is abandoned and the process killed after `timeout`.
#[instrument(skip(command, output_dir, timeout), fields(stem = %stem))]
pub async fn download_audio(
    command: &[String],
    url: &str,
    stem: &str,
    output_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf> {
    let (program, leading_args) = command
        .split_first()
        .ok_or_else(|| TubelensError::Config("downloader command is empty".to_string()))?;

    tokio::fs::create_dir_all(output_dir).await?;
    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", stem));

    let mut cmd = Command::new(program);
    cmd.args(leading_args)
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("5")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => {
            return Err(TubelensError::Timeout(format!(
                "audio download did not finish within {}s",
                timeout.as_secs()
            )));
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TubelensError::ToolNotFound(program.clone()));
        }
        Ok(Err(e)) => {
            return Err(TubelensError::AudioDownload(format!("{program} execution failed: {e}")));
        }
        Ok(Ok(o)) => o,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TubelensError::AudioDownload(format!("{program} failed: {}", stderr.trim())));
    }

    find_audio_file(output_dir, stem).await
}

/// Locates a downloaded audio file by its file stem.
async fn find_audio_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    // Common audio formats that yt-dlp may produce
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| TubelensError::AudioDownload(format!("Cannot read directory: {e}")))?;

    while let Some(entry) = entries.next_entry().await? {
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file && entry.file_name().to_string_lossy().starts_with(stem) {
            return Ok(entry.path());
        }
    }

    Err(TubelensError::AudioDownload("Audio file not found after download".into()))
}

/// Segments a long audio file into smaller chunks for processing.
///
/// Each chunk will be approximately `chunk_seconds` long. Returns tuples of
/// (chunk_path, offset_seconds) for each segment.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    tokio::fs::create_dir_all(output_dir).await?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = chunk_seconds.max(1) as f64;

    // Short audio doesn't need splitting
    if total_duration <= chunk_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extracts a time segment from an audio file as MP3.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // First attempt: stream copy (fast, no quality loss) when the source is already MP3
    let is_mp3 = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));

    if is_mp3 {
        let copy_result = Command::new("ffmpeg")
            .arg("-ss").arg(format!("{:.3}", start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", length))
            .arg("-c").arg("copy")
            .arg("-y")
            .arg("-loglevel").arg("warning")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        if let Ok(status) = copy_result {
            if status.success() && dest.exists() {
                return Ok(());
            }
        }

        warn!("Stream copy failed, re-encoding segment");
    }

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("4")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(TubelensError::AudioDownload(format!("Segment extraction failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TubelensError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(TubelensError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TubelensError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(TubelensError::AudioDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(TubelensError::AudioDownload("ffprobe could not read the audio file".into()));
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Extract `format.duration` from ffprobe's JSON output.
fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| TubelensError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| TubelensError::AudioDownload("Could not determine audio duration".into()))
}
