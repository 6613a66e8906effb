//! CLI command implementations.

mod analyze;
mod config;
mod doctor;
mod serve;
mod transcript;
mod upload;

pub use analyze::run_analyze;
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{router, run_serve, AppState};
pub use transcript::run_transcript;
pub use upload::run_upload;

use crate::cli::Output;
use crate::error::TubelensError;

/// Print a pipeline failure, with the recovery hint when there is one.
fn report_failure(error: &TubelensError) {
    match error {
        TubelensError::NoCaptionsAvailable { suggestion, details } => {
            Output::error("Could not obtain a transcript for this video.");
            Output::kv("Last failure", details);
            Output::info(suggestion);
        }
        TubelensError::ToolNotFound(_) | TubelensError::Config(_) => {
            Output::error(&error.to_string());
            Output::info("Run 'tubelens doctor' for detailed diagnostics.");
        }
        other => Output::error(&other.to_string()),
    }
}
