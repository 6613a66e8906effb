//! HTTP API server.
//!
//! Provides JSON endpoints for video analysis, raw transcripts and audio uploads.

use crate::audio::AudioUpload;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::pipeline::{AnalysisResponse, Pipeline, TranscriptResponse};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Form field carrying the uploaded audio file.
const UPLOAD_FIELD: &str = "audio";

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state.
pub struct AppState {
    pub pipeline: Pipeline,
    /// Wall-clock budget for one request.
    pub request_timeout: Duration,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let request_timeout = Duration::from_secs(settings.server.request_timeout_secs);

    let pipeline = Pipeline::new(settings)?;
    let app = router(Arc::new(AppState {
        pipeline,
        request_timeout,
    }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Tubelens API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Analyze", "POST /api/analyze     {\"url\": \"...\"}");
    Output::kv("Transcript", "POST /api/transcript  {\"url\": \"...\"}");
    Output::kv("Upload", "POST /api/upload      multipart field 'audio'");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.pipeline.upload_policy().max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/transcript", post(transcript))
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct UrlRequest {
    /// YouTube URL or bare video ID
    #[serde(default)]
    url: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// A pipeline error rendered as an HTTP response.
struct ApiError(TubelensError);

impl From<TubelensError> for ApiError {
    fn from(err: TubelensError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            TubelensError::NoCaptionsAvailable { suggestion, details } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "No captions available for this video".to_string(),
                    suggestion: Some(suggestion),
                    details: Some(details),
                },
            ),
            TubelensError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    suggestion: None,
                    details: None,
                },
            ),
            TubelensError::Timeout(message) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    error: "Request timed out".to_string(),
                    suggestion: None,
                    details: Some(message),
                },
            ),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Failed to analyze content".to_string(),
                        suggestion: None,
                        details: Some(other.to_string()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Run `fut` within the request's wall-clock budget.
async fn within_budget<T>(budget: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(budget, fut).await.map_err(|_| {
        TubelensError::Timeout(format!("request exceeded {}s", budget.as_secs_f32()))
    })?
}

fn required_url(payload: std::result::Result<Json<UrlRequest>, JsonRejection>) -> Result<String> {
    let Json(request) = payload.map_err(|e| TubelensError::InvalidInput(e.body_text()))?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err(TubelensError::InvalidInput("YouTube URL is required".to_string()));
    }
    Ok(url.to_string())
}

fn invalid_multipart(err: MultipartError) -> TubelensError {
    TubelensError::InvalidInput(format!("Invalid upload: {}", err.body_text()))
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> std::result::Result<Json<AnalysisResponse>, ApiError> {
    let url = required_url(payload)?;
    info!("Analyze request for {}", url);

    let response = within_budget(state.request_timeout, state.pipeline.analyze_video(&url)).await?;
    Ok(Json(response))
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> std::result::Result<Json<TranscriptResponse>, ApiError> {
    let url = required_url(payload)?;
    info!("Transcript request for {}", url);

    let response =
        within_budget(state.request_timeout, state.pipeline.fetch_transcript(&url)).await?;
    Ok(Json(response))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<AnalysisResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        TubelensError::InvalidInput(format!("Expected a multipart form: {}", e.body_text()))
    })?;

    let mut received = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid_multipart)?;
        received = Some(AudioUpload::new(file_name, content_type, bytes));
        break;
    }

    let upload = received.ok_or_else(|| {
        TubelensError::InvalidInput(format!(
            "No audio file provided (expected form field '{}')",
            UPLOAD_FIELD
        ))
    })?;
    info!("Upload request for {} ({} bytes)", upload.file_name, upload.size());

    let response = within_budget(state.request_timeout, state.pipeline.analyze_upload(upload)).await?;
    Ok(Json(response))
}
