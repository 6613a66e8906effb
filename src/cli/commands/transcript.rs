//! Transcript command implementation.

use super::report_failure;
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(url: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Fetching transcript for {}...", url));
    let result = pipeline.fetch_transcript(url).await;
    spinner.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };

    match output {
        Some(path) => {
            let path = Settings::expand_path(&path);
            std::fs::write(&path, &response.transcript)?;
            Output::success(&format!(
                "Wrote {} characters from {} to {}",
                response.transcript_length,
                response.transcript_source,
                path.display()
            ));
        }
        None => {
            Output::kv("Video", &response.video_id);
            Output::kv("Source", response.transcript_source.as_str());
            Output::kv("Length", &format!("{} characters", response.transcript_length));
            println!();
            println!("{}", response.transcript);
        }
    }

    Ok(())
}
