//! Application state shared by all handlers.

use crate::inference::InferenceClient;
use anyhow::Context;
use skintegrity_core::Config;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub inference: InferenceClient,
    /// Hosts the poll relay may contact.
    pub poll_allowlist: Vec<String>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let endpoint = config
            .inference_endpoint()
            .context("INFERENCE_ENDPOINT is required")?;

        let inference = InferenceClient::new(
            endpoint,
            Duration::from_secs(config.inference_timeout_secs()),
            Duration::from_secs(config.poll_relay_timeout_secs()),
            config.poll_url_allowlist(),
        )
        .context("Failed to build inference client")?;

        let poll_allowlist = inference.poll_allowlist().to_vec();

        tracing::info!(
            inference_endpoint = %inference.endpoint(),
            poll_allowlist = %poll_allowlist.join(","),
            "Application state initialized"
        );

        Ok(Self {
            config: config.clone(),
            inference,
            poll_allowlist,
        })
    }
}
