//! Upload command implementation.

use super::analyze::print_analysis;
use super::report_failure;
use crate::audio::{AudioUpload, UploadPolicy};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the upload command on a local audio file.
pub async fn run_upload(file: &str, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Upload) {
        report_failure(&e);
        return Err(e.into());
    }

    let path = Settings::expand_path(file);
    if !path.is_file() {
        Output::error(&format!("File not found: {}", path.display()));
        return Err(anyhow::anyhow!("File not found: {}", path.display()));
    }

    let upload = AudioUpload::from_path(&path).await?;
    // Reject before loading the transcription stack
    let policy = UploadPolicy::from_settings(&settings.upload);
    if let Err(e) = policy.validate(&upload.file_name, None, upload.size()) {
        report_failure(&e);
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Transcribing and analyzing {}...", upload.file_name));
    let result = pipeline.analyze_upload(upload).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => print_analysis(&response, json),
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}
