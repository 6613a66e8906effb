//! Analyze command implementation.

use super::report_failure;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{AnalysisResponse, Pipeline};
use anyhow::Result;

/// Run the analyze command.
pub async fn run_analyze(url: &str, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Analyze) {
        report_failure(&e);
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Analyzing {}...", url));
    let result = pipeline.analyze_video(url).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            print_analysis(&response, json)?;
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}

/// Print an analysis either as JSON or as a human-readable report.
pub(super) fn print_analysis(response: &AnalysisResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    Output::header(&format!("Analysis: {}", response.video_id));
    Output::kv("Transcript source", response.transcript_source.as_str());
    Output::kv(
        "Transcript length",
        &format!("{} characters", response.transcript_length),
    );
    println!();
    println!("{}", response.analysis);
    Ok(())
}
