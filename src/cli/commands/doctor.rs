//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Settings, WEBHOOK_URL_ENV};
use crate::transcript::TranscriptSource;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Tubelens Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();
    let strategies = &settings.transcript.strategies;

    // Missing tools only matter for the strategies that use them
    let downloader_needed = strategies.contains(&TranscriptSource::SubtitleDownload)
        || strategies.contains(&TranscriptSource::AudioTranscription);

    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        match settings.subtitles.command.first() {
            Some(program) => check_tool(program, "--version", install_hint_ytdlp(), downloader_needed),
            None => CheckResult::warning(
                "downloader",
                "subtitles.command is empty",
                "subtitle-download and audio-transcription will be skipped",
            ),
        },
        check_tool("ffmpeg", "-version", install_hint_ffmpeg(), true),
        check_tool("ffprobe", "-version", install_hint_ffmpeg(), true),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    println!("{}", style("API Configuration").bold());
    let api_checks = vec![check_openai_api_key(), check_webhook(settings)];
    for check in &api_checks {
        check.print();
    }
    checks.extend(api_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(config_path), check_temp_dir(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    println!("{}", style("Transcript Strategies").bold());
    if strategies.is_empty() {
        Output::warning("No transcript strategies configured; only uploads will work.");
    }
    for (idx, source) in strategies.iter().enumerate() {
        println!("  {}. {}", idx + 1, source);
    }

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Tubelens.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Tubelens is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
///
/// A missing optional tool is a warning: the strategies that need it are skipped.
fn check_tool(name: &str, version_arg: &str, hint: &str, required: bool) -> CheckResult {
    let missing = |message: &str| {
        if required {
            CheckResult::error(name, message, hint)
        } else {
            CheckResult::warning(name, message, hint)
        }
    };

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            CheckResult::ok(name, &truncate_display(&version, 50))
        }
        Ok(_) => missing("installed but not working"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => missing("not found"),
        Err(e) => missing(&format!("error: {}", e)),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.trim().is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check the transcript webhook bridge.
fn check_webhook(settings: &Settings) -> CheckResult {
    match settings.webhook.url.as_deref() {
        Some(url) => match url::Url::parse(url) {
            Ok(parsed) => CheckResult::ok(
                "Webhook",
                &format!("{} (timeout {}s)", parsed.host_str().unwrap_or(url), settings.webhook.timeout_secs),
            ),
            Err(e) => CheckResult::error(
                "Webhook",
                &format!("invalid URL: {}", e),
                "Fix webhook.url in the config file",
            ),
        },
        None => CheckResult::warning(
            "Webhook",
            "not configured (fallback-api will be skipped)",
            &format!("Set webhook.url or {}", WEBHOOK_URL_ENV),
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: tubelens config edit",
        )
    }
}

/// Check that the scratch directory can be created.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    match std::fs::create_dir_all(&temp_dir) {
        Ok(()) => CheckResult::ok("Temp directory", &format!("{}", temp_dir.display())),
        Err(e) => CheckResult::error(
            "Temp directory",
            &format!("{} ({})", temp_dir.display(), e),
            "Set general.temp_dir to a writable directory",
        ),
    }
}

fn truncate_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_optional_tool_missing_is_warning() {
        let optional = check_tool("tubelens-no-such-tool", "--version", "hint", false);
        assert_eq!(optional.status, CheckStatus::Warning);

        let required = check_tool("tubelens-no-such-tool", "--version", "hint", true);
        assert_eq!(required.status, CheckStatus::Error);
    }

    #[test]
    fn test_webhook_check() {
        let mut settings = Settings::default();
        settings.webhook.url = None;
        assert_eq!(check_webhook(&settings).status, CheckStatus::Warning);

        settings.webhook.url = Some("https://hooks.example.com/transcript".into());
        let result = check_webhook(&settings);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("hooks.example.com"));

        settings.webhook.url = Some("not a url".into());
        assert_eq!(check_webhook(&settings).status, CheckStatus::Error);
    }

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display("short", 50), "short");
        assert_eq!(truncate_display("abcdef", 3), "abc...");
    }
}
