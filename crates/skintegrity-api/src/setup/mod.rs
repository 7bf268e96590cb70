//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use skintegrity_core::Config;
use std::sync::Arc;

/// Validate configuration and build state and routes.
///
/// Telemetry is installed by the caller, before configuration is read.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate_for_api()
        .context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let state = Arc::new(AppState::new(&config)?);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
