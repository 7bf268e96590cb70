//! Client for the scanner API's trigger and poll-relay endpoints.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use skintegrity_core::constants::{POLL_RESULT_PATH, PROCESS_VIDEO_PATH};
use skintegrity_core::{AnalysisOutcome, Config};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The API answered with an error body.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Request to scanner API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from scanner API: {0}")]
    InvalidResponse(String),
}

/// The two calls the analysis flow makes against the scanner API.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Submit a public video URL for analysis.
    async fn process_video(&self, video_url: &str) -> Result<AnalysisOutcome, GatewayError>;

    /// Relay one status check for a poll URL returned by `process_video`.
    async fn poll_result(&self, poll_url: &str) -> Result<AnalysisOutcome, GatewayError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ScannerApiClient {
    client: Client,
    base_url: String,
}

impl ScannerApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.scanner_api_url())
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: JsonValue) -> Result<AnalysisOutcome, GatewayError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "Calling scanner API");
        let response = self.client.post(&url).json(&body).send().await?;
        read_outcome(response).await
    }
}

#[async_trait]
impl InferenceGateway for ScannerApiClient {
    async fn process_video(&self, video_url: &str) -> Result<AnalysisOutcome, GatewayError> {
        self.post(PROCESS_VIDEO_PATH, json!({ "video_url": video_url }))
            .await
    }

    async fn poll_result(&self, poll_url: &str) -> Result<AnalysisOutcome, GatewayError> {
        self.post(POLL_RESULT_PATH, json!({ "poll_url": poll_url }))
            .await
    }
}

/// Map an API response onto an outcome.
///
/// Poll-relay answers carry an outcome body even on non-2xx statuses, so the
/// tagged shape is tried first whatever the status. A `failed` outcome on a
/// 5xx status is a relay-side error, not a verdict, and comes back as `Err`.
async fn read_outcome(response: Response) -> Result<AnalysisOutcome, GatewayError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Option<JsonValue> = serde_json::from_str(&text).ok();

    if let Some(body) = &body {
        match serde_json::from_value::<AnalysisOutcome>(body.clone()) {
            // The relay could not reach the inference service; worth retrying.
            Ok(AnalysisOutcome::Failed { message }) if status.is_server_error() => {
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(outcome) => return Ok(outcome),
            Err(_) => {}
        }
    }

    if !status.is_success() {
        let message = body
            .and_then(|b| serde_json::from_value::<ErrorBody>(b).ok())
            .map(|b| b.error)
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    "Server error".to_string()
                } else {
                    text
                }
            });
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    if status == StatusCode::ACCEPTED {
        return Ok(AnalysisOutcome::processing(None));
    }

    body.as_ref()
        .and_then(AnalysisOutcome::from_upstream)
        .ok_or_else(|| GatewayError::InvalidResponse(text))
}
