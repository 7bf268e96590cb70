//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;

/// Liveness check - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness check - the inference endpoint is configured and accepts TCP connections.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let endpoint = state.inference.endpoint();
    let mut response = serde_json::json!({
        "status": "ready",
        "inference_endpoint": "configured",
        "inference": "unknown"
    });

    let address = match (endpoint.host_str(), endpoint.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        _ => {
            response["status"] = serde_json::json!("not_ready");
            response["inference_endpoint"] = serde_json::json!("invalid");
            return (StatusCode::SERVICE_UNAVAILABLE, Json(response));
        }
    };

    let overall_ready =
        match tokio::time::timeout(TIMEOUT, tokio::net::TcpStream::connect(&address)).await {
            Ok(Ok(_)) => {
                response["inference"] = serde_json::json!("reachable");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, address = %address, "Inference readiness check failed");
                response["inference"] = serde_json::json!(format!("unreachable: {}", e));
                false
            }
            Err(_) => {
                tracing::error!(address = %address, "Inference readiness check timed out");
                response["inference"] = serde_json::json!("timeout");
                false
            }
        };

    let status_code = if overall_ready {
        StatusCode::OK
    } else {
        response["status"] = serde_json::json!("not_ready");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
