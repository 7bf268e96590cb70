//! Trigger endpoint and poll relay.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::inference::{InferenceError, TriggerResponse, UpstreamResponse};
use crate::state::AppState;
use crate::utils::poll_url::validate_poll_url;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use skintegrity_core::models::{required_field, PollResultRequest, ProcessVideoRequest};
use skintegrity_core::{AnalysisOutcome, AppError};
use std::sync::Arc;

const STILL_PROCESSING_MESSAGE: &str = "Video is still being processed";
const POLL_TIMEOUT_MESSAGE: &str = "Processing is taking longer than expected";

/// Submit a video URL to the inference service
#[utoipa::path(
    post,
    path = "/api/process-video",
    tag = "analysis",
    request_body = ProcessVideoRequest,
    responses(
        (status = 200, description = "Result returned immediately", body = AnalysisOutcome),
        (status = 202, description = "Accepted; poll `poll_url` for the result", body = AnalysisOutcome),
        (status = 400, description = "Invalid JSON or missing video_url", body = ErrorResponse),
        (status = 408, description = "Inference service timed out", body = ErrorResponse),
        (status = 500, description = "Inference service unreachable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn process_video(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ProcessVideoRequest>,
) -> Result<Response, HttpAppError> {
    let video_url = required_field(request.video_url.as_deref())
        .ok_or_else(|| AppError::BadRequest("video_url is required".to_string()))?;

    tracing::info!(video_url = %video_url, "Submitting video for analysis");

    match state.inference.submit(video_url).await? {
        TriggerResponse::Redirect { poll_url } => {
            tracing::info!(poll_url = %poll_url, "Analysis accepted, result will be polled");
            Ok((
                StatusCode::ACCEPTED,
                Json(AnalysisOutcome::processing(Some(poll_url))),
            )
                .into_response())
        }
        TriggerResponse::Immediate(upstream) => immediate_response(upstream),
    }
}

fn immediate_response(upstream: UpstreamResponse) -> Result<Response, HttpAppError> {
    if !upstream.status.is_success() {
        return Err(AppError::Upstream {
            status: upstream.status.as_u16(),
            message: upstream.message(),
        }
        .into());
    }

    let normalized = upstream
        .json
        .as_ref()
        .and_then(AnalysisOutcome::from_upstream)
        .filter(|outcome| matches!(outcome, AnalysisOutcome::Completed { .. }));

    Ok(match normalized {
        Some(outcome) => (upstream.status, Json(outcome)).into_response(),
        None => (upstream.status, Json(upstream.body())).into_response(),
    })
}

/// Check a poll URL returned by the trigger endpoint
#[utoipa::path(
    post,
    path = "/api/poll-result",
    tag = "analysis",
    request_body = PollResultRequest,
    responses(
        (status = 200, description = "Analysis completed or failed", body = AnalysisOutcome),
        (status = 202, description = "Analysis still running", body = AnalysisOutcome),
        (status = 400, description = "Invalid JSON, missing or disallowed poll_url", body = ErrorResponse),
        (status = 502, description = "Unreadable upstream result", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn poll_result(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PollResultRequest>,
) -> Result<Response, HttpAppError> {
    let poll_url = required_field(request.poll_url.as_deref())
        .ok_or_else(|| AppError::BadRequest("poll_url is required".to_string()))?;

    let poll_url =
        validate_poll_url(poll_url, &state.poll_allowlist).map_err(AppError::BadRequest)?;

    match state.inference.check(&poll_url).await {
        Ok(upstream) => poll_response(upstream),
        Err(InferenceError::Timeout) => Ok((
            StatusCode::ACCEPTED,
            Json(AnalysisOutcome::Processing {
                poll_url: None,
                message: Some(POLL_TIMEOUT_MESSAGE.to_string()),
            }),
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, poll_url = %poll_url, "Polling the inference service failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalysisOutcome::failed(e.to_string())),
            )
                .into_response())
        }
    }
}

fn poll_response(upstream: UpstreamResponse) -> Result<Response, HttpAppError> {
    if upstream.status == StatusCode::ACCEPTED {
        return Ok((
            StatusCode::ACCEPTED,
            Json(AnalysisOutcome::Processing {
                poll_url: None,
                message: Some(STILL_PROCESSING_MESSAGE.to_string()),
            }),
        )
            .into_response());
    }

    if !upstream.status.is_success() {
        tracing::warn!(status = upstream.status.as_u16(), "Poll URL answered with an error");
        return Ok((
            upstream.status,
            Json(AnalysisOutcome::failed(format!(
                "Polling failed: {}",
                upstream.text
            ))),
        )
            .into_response());
    }

    match upstream.json.as_ref().and_then(AnalysisOutcome::from_upstream) {
        Some(outcome @ AnalysisOutcome::Processing { .. }) => {
            Ok((StatusCode::ACCEPTED, Json(outcome)).into_response())
        }
        Some(outcome) => Ok((StatusCode::OK, Json(outcome)).into_response()),
        None => Err(AppError::BadGateway(
            "Inference service returned an unreadable result".to_string(),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn upstream(status: StatusCode, body: serde_json::Value) -> UpstreamResponse {
        UpstreamResponse {
            status,
            text: body.to_string(),
            json: Some(body),
        }
    }

    #[test]
    fn test_immediate_non_success_passes_status_through() {
        let err = immediate_response(upstream(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"error": "unsupported codec"}),
        ))
        .unwrap_err();
        match err.0 {
            AppError::Upstream { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "unsupported codec");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_poll_ok_without_result_is_bad_gateway() {
        let err = poll_response(upstream(StatusCode::OK, json!({"hello": "world"}))).unwrap_err();
        assert!(matches!(err.0, AppError::BadGateway(_)));
    }

    #[test]
    fn test_poll_ok_with_pending_status_is_processing() {
        let response = poll_response(upstream(StatusCode::OK, json!({"status": "queued"}))).unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
