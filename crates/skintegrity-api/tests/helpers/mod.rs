//! Test helpers: a mock inference service and an API server pointed at it.
//!
//! The mock is a plain axum router bound to `127.0.0.1:0`; the API under test
//! is wrapped in `axum_test::TestServer`.

use axum::Router;
use axum_test::TestServer;
use skintegrity_api::setup::routes::setup_routes;
use skintegrity_api::AppState;
use skintegrity_core::{Config, ScannerConfig};
use std::net::SocketAddr;
use std::sync::Arc;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock upstream");
    });
    format!("http://{}", addr)
}

pub fn test_config(inference_endpoint: &str) -> ScannerConfig {
    ScannerConfig {
        inference_endpoint: Some(inference_endpoint.to_string()),
        inference_timeout_secs: 1,
        poll_relay_timeout_secs: 1,
        ..ScannerConfig::default()
    }
}

/// API test server forwarding to `inference_endpoint`.
pub fn test_server(config: ScannerConfig) -> TestServer {
    let config = Config::new(config);
    let state = Arc::new(AppState::new(&config).expect("Failed to build state"));
    let router = setup_routes(&config, state).expect("Failed to build routes");
    TestServer::new(router).expect("Failed to start test server")
}
