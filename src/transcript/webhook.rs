//! Bridged third-party transcript API.
//!
//! A hosted workflow (n8n, Make, a serverless function...) receives the video
//! URL, queries a captions-scraping API on our behalf and answers with
//! `{ "success": bool, "transcript"?: string, "error"?: string }`.

use super::{TranscriptSource, TranscriptStrategy};
use crate::config::Settings;
use crate::error::{Result, TubelensError};
use crate::video_id::VideoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookRequest<'a> {
    url: &'a str,
    video_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Workflow tools often wrap the response item in a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WebhookPayload {
    Single(WebhookResponse),
    Batch(Vec<WebhookResponse>),
}

impl WebhookPayload {
    fn into_response(self) -> Option<WebhookResponse> {
        match self {
            WebhookPayload::Single(response) => Some(response),
            WebhookPayload::Batch(responses) => responses.into_iter().next(),
        }
    }
}

/// Posts the video URL to a configured webhook and reads back a transcript.
pub struct WebhookStrategy {
    client: reqwest::Client,
    url: Option<String>,
    timeout: Duration,
}

impl WebhookStrategy {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TubelensError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.webhook.url.clone(),
            Duration::from_secs(settings.webhook.timeout_secs),
        )
    }

    fn failure(message: impl Into<String>) -> TubelensError {
        TubelensError::Strategy {
            strategy: TranscriptSource::FallbackApi,
            message: message.into(),
        }
    }
}

#[async_trait]
impl TranscriptStrategy for WebhookStrategy {
    fn source(&self) -> TranscriptSource {
        TranscriptSource::FallbackApi
    }

    fn unavailable_reason(&self) -> Option<String> {
        match &self.url {
            None => Some("no webhook URL configured".to_string()),
            Some(url) => match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
                Ok(parsed) => Some(format!("unsupported webhook scheme '{}'", parsed.scheme())),
                Err(e) => Some(format!("invalid webhook URL: {}", e)),
            },
        }
    }

    #[instrument(skip(self, source_url), fields(video_id = %video))]
    async fn fetch(&self, video: &VideoId, source_url: &str) -> Result<String> {
        let endpoint = self
            .url
            .as_deref()
            .ok_or_else(|| Self::failure("no webhook URL configured"))?;

        let response = self
            .client
            .post(endpoint)
            .json(&WebhookRequest {
                url: source_url,
                video_id: video.as_str(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Self::failure(format!("timed out after {}s", self.timeout.as_secs()))
                } else {
                    Self::failure(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(format!("webhook returned HTTP {}", status)));
        }

        let payload: WebhookPayload = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Self::failure(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                Self::failure(format!("unexpected response shape: {}", e))
            }
        })?;

        let body = payload
            .into_response()
            .ok_or_else(|| Self::failure("webhook returned an empty list"))?;

        if !body.success {
            return Err(Self::failure(
                body.error
                    .unwrap_or_else(|| "webhook reported failure".to_string()),
            ));
        }

        let transcript = body
            .transcript
            .ok_or_else(|| Self::failure("response has no transcript field"))?;
        debug!("Webhook returned {} bytes", transcript.len());

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/hook", addr)
    }

    fn video() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    async fn fetch_with(app: Router, timeout: Duration) -> Result<String> {
        let url = serve(app).await;
        let strategy = WebhookStrategy::new(Some(url), timeout).unwrap();
        strategy
            .fetch(&video(), "https://youtu.be/dQw4w9WgXcQ")
            .await
    }

    #[tokio::test]
    async fn test_successful_response() {
        let app = Router::new().route(
            "/hook",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["videoId"], "dQw4w9WgXcQ");
                assert_eq!(body["url"], "https://youtu.be/dQw4w9WgXcQ");
                Json(serde_json::json!({ "success": true, "transcript": "bridged text" }))
            }),
        );

        let text = fetch_with(app, Duration::from_secs(5)).await.unwrap();
        assert_eq!(text, "bridged text");
    }

    #[tokio::test]
    async fn test_array_wrapped_response() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                Json(serde_json::json!([{ "success": true, "transcript": "wrapped" }]))
            }),
        );

        let text = fetch_with(app, Duration::from_secs(5)).await.unwrap();
        assert_eq!(text, "wrapped");
    }

    #[tokio::test]
    async fn test_reported_failure() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                Json(serde_json::json!({ "success": false, "error": "quota exceeded" }))
            }),
        );

        let err = fetch_with(app, Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.to_string(), "fallback-api failed: quota exceeded");
    }

    #[tokio::test]
    async fn test_missing_transcript_field() {
        let app = Router::new().route(
            "/hook",
            post(|| async { Json(serde_json::json!({ "success": true })) }),
        );

        let err = fetch_with(app, Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().contains("no transcript field"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "success": true, "transcript": "too late" }))
            }),
        );

        let err = fetch_with(app, Duration::from_millis(200)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[test]
    fn test_unavailable_without_url() {
        let strategy = WebhookStrategy::new(None, Duration::from_secs(30)).unwrap();
        assert!(strategy.unavailable_reason().is_some());

        let strategy =
            WebhookStrategy::new(Some("  ".to_string()), Duration::from_secs(30)).unwrap();
        assert!(strategy.unavailable_reason().is_some());

        let strategy =
            WebhookStrategy::new(Some("ftp://example.com".to_string()), Duration::from_secs(30))
                .unwrap();
        assert!(strategy.unavailable_reason().is_some());

        let strategy = WebhookStrategy::new(
            Some("https://hooks.example.com/transcript".to_string()),
            Duration::from_secs(30),
        )
        .unwrap();
        assert!(strategy.unavailable_reason().is_none());
    }
}
