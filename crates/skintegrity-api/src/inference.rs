//! Client for the remote inference service.
//!
//! The service accepts `POST {video_url}` and either answers with a result
//! directly or with `303 See Other` pointing at a URL to poll. Trigger
//! redirects are never followed; the poll URL is handed back to the caller.
//! Poll checks follow redirects, but only to allowlisted hosts.

use reqwest::redirect::Policy;
use reqwest::{header, Client, StatusCode, Url};
use serde_json::{json, Value as JsonValue};
use crate::utils::poll_url::validate_poll_url;
use skintegrity_core::AppError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Inference request timed out")]
    Timeout,

    #[error("Inference service unreachable: {0}")]
    Unreachable(String),

    #[error("No Location header on redirect")]
    MissingLocation,

    #[error("Invalid redirect location: {0}")]
    InvalidLocation(String),

    #[error("Invalid inference endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else {
            InferenceError::Unreachable(err.to_string())
        }
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Timeout => AppError::UpstreamTimeout(
                skintegrity_core::constants::TRIGGER_TIMEOUT_MESSAGE.to_string(),
            ),
            InferenceError::Unreachable(msg) => AppError::UpstreamUnreachable(msg),
            InferenceError::MissingLocation | InferenceError::InvalidLocation(_) => {
                AppError::Upstream {
                    status: 500,
                    message: err.to_string(),
                }
            }
            InferenceError::InvalidEndpoint(msg) => AppError::Internal(msg),
        }
    }
}

/// A non-redirect upstream answer: status plus body, JSON when it parses.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub json: Option<JsonValue>,
    pub text: String,
}

impl UpstreamResponse {
    async fn read(response: reqwest::Response) -> Result<Self, InferenceError> {
        let status = response.status();
        let text = response.text().await?;
        let json = serde_json::from_str(&text).ok();
        Ok(Self { status, json, text })
    }

    /// Body as JSON, wrapping plain text so it can still be passed through.
    pub fn body(&self) -> JsonValue {
        self.json
            .clone()
            .unwrap_or_else(|| json!({ "message": self.text }))
    }

    /// Best human-readable description of the body.
    pub fn message(&self) -> String {
        self.json
            .as_ref()
            .and_then(|body| {
                ["error", "message", "detail"]
                    .iter()
                    .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
            })
            .map(String::from)
            .unwrap_or_else(|| self.text.trim().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResponse {
    /// `303` with a resolved absolute poll URL.
    Redirect { poll_url: String },
    Immediate(UpstreamResponse),
}

const MAX_POLL_REDIRECTS: usize = 10;

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    poll_client: Client,
    endpoint: Url,
    poll_timeout: Duration,
    poll_allowlist: Vec<String>,
}

/// Follow a poll redirect only while it stays on allowlisted hosts.
fn poll_redirect_policy(allowlist: Vec<String>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_POLL_REDIRECTS {
            attempt.error("too many redirects")
        } else if let Err(reason) = validate_poll_url(attempt.url().as_str(), &allowlist) {
            tracing::warn!(location = %attempt.url(), reason = %reason, "Not following poll redirect");
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

impl InferenceClient {
    /// `poll_allowlist` defaults to the endpoint host when `None`.
    pub fn new(
        endpoint: &str,
        trigger_timeout: Duration,
        poll_timeout: Duration,
        poll_allowlist: Option<&[String]>,
    ) -> Result<Self, InferenceError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| InferenceError::InvalidEndpoint(e.to_string()))?;
        let poll_allowlist = match poll_allowlist {
            Some(hosts) => hosts.to_vec(),
            None => endpoint
                .host_str()
                .map(|host| vec![host.to_string()])
                .unwrap_or_default(),
        };

        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(trigger_timeout)
            .build()
            .map_err(|e| InferenceError::InvalidEndpoint(e.to_string()))?;
        let poll_client = Client::builder()
            .redirect(poll_redirect_policy(poll_allowlist.clone()))
            .timeout(poll_timeout)
            .build()
            .map_err(|e| InferenceError::InvalidEndpoint(e.to_string()))?;

        Ok(Self {
            client,
            poll_client,
            endpoint,
            poll_timeout,
            poll_allowlist,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Hosts poll URLs and their redirects may point at.
    pub fn poll_allowlist(&self) -> &[String] {
        &self.poll_allowlist
    }

    /// Submit a public video URL for analysis.
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn submit(&self, video_url: &str) -> Result<TriggerResponse, InferenceError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "video_url": video_url }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    error = %e,
                    timeout = e.is_timeout(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Inference trigger failed"
                );
                InferenceError::from(e)
            })?;

        let status = response.status();
        tracing::info!(
            status = status.as_u16(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Inference service answered"
        );

        if status == StatusCode::SEE_OTHER {
            let location = response
                .headers()
                .get(header::LOCATION)
                .ok_or(InferenceError::MissingLocation)?
                .to_str()
                .map_err(|e| InferenceError::InvalidLocation(e.to_string()))?;
            let poll_url = self
                .endpoint
                .join(location)
                .map_err(|e| InferenceError::InvalidLocation(e.to_string()))?;
            return Ok(TriggerResponse::Redirect {
                poll_url: poll_url.to_string(),
            });
        }

        Ok(TriggerResponse::Immediate(
            UpstreamResponse::read(response).await?,
        ))
    }

    /// Check a poll URL once, bounded by the poll timeout.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, poll_url: &Url) -> Result<UpstreamResponse, InferenceError> {
        let response = self
            .poll_client
            .get(poll_url.clone())
            .timeout(self.poll_timeout)
            .send()
            .await?;

        UpstreamResponse::read(response).await
    }
}
