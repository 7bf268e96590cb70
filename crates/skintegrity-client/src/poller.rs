//! Bounded polling for a terminal analysis outcome.

use crate::api::InferenceGateway;
use crate::error::PollError;
use async_trait::async_trait;
use skintegrity_core::{AnalysisOutcome, ClassificationResult, Config};
use skintegrity_db::ResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub initial_delay: Duration,
    /// Extra initial delay per MiB of uploaded video.
    pub delay_per_mb: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.poll_max_attempts(),
            interval: Duration::from_secs(config.poll_interval_secs()),
            initial_delay: Duration::from_secs(config.poll_initial_delay_secs()),
            delay_per_mb: Duration::from_millis(config.poll_delay_per_mb_ms()),
        }
    }

    /// Saturates instead of overflowing on huge per-MiB settings.
    pub fn initial_delay_for(&self, size_bytes: usize) -> Duration {
        let megabytes = size_bytes as f64 / (1024.0 * 1024.0);
        Duration::try_from_secs_f64(self.delay_per_mb.as_secs_f64() * megabytes)
            .ok()
            .and_then(|extra| self.initial_delay.checked_add(extra))
            .unwrap_or(Duration::MAX)
    }
}

/// One status check against wherever the result lands.
#[async_trait]
pub trait PollSource: Send + Sync {
    async fn check(&self) -> anyhow::Result<AnalysisOutcome>;
}

/// Reads the result row keyed by the public video URL.
pub struct RowPollSource {
    store: Arc<dyn ResultStore>,
    video_url: String,
}

impl RowPollSource {
    pub fn new(store: Arc<dyn ResultStore>, video_url: impl Into<String>) -> Self {
        Self {
            store,
            video_url: video_url.into(),
        }
    }
}

#[async_trait]
impl PollSource for RowPollSource {
    async fn check(&self) -> anyhow::Result<AnalysisOutcome> {
        let row = self.store.get_by_video_url(&self.video_url).await?;
        // The row may not be visible yet.
        Ok(row
            .map(|r| r.outcome())
            .unwrap_or_else(|| AnalysisOutcome::processing(None)))
    }
}

/// Asks the poll relay about a poll URL.
pub struct HttpPollSource {
    gateway: Arc<dyn InferenceGateway>,
    poll_url: String,
}

impl HttpPollSource {
    pub fn new(gateway: Arc<dyn InferenceGateway>, poll_url: impl Into<String>) -> Self {
        Self {
            gateway,
            poll_url: poll_url.into(),
        }
    }
}

#[async_trait]
impl PollSource for HttpPollSource {
    async fn check(&self) -> anyhow::Result<AnalysisOutcome> {
        Ok(self.gateway.poll_result(&self.poll_url).await?)
    }
}

/// Check `source` until it reports a terminal outcome.
///
/// Performs at most `policy.max_attempts` checks, sleeping `initial_delay`
/// before the first and `policy.interval` between the others. Check errors
/// count as an attempt and are retried.
pub async fn poll_until_terminal(
    source: &dyn PollSource,
    policy: &PollPolicy,
    initial_delay: Duration,
    cancel: &CancellationToken,
) -> Result<ClassificationResult, PollError> {
    sleep_or_cancel(initial_delay, cancel).await?;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            sleep_or_cancel(policy.interval, cancel).await?;
        }

        let checked = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            checked = source.check() => checked,
        };

        match checked {
            Ok(AnalysisOutcome::Completed {
                classification,
                confidence,
            }) => {
                tracing::info!(attempt, %classification, "Analysis completed");
                return Ok(ClassificationResult {
                    classification,
                    confidence,
                });
            }
            Ok(AnalysisOutcome::Failed { message }) => {
                tracing::warn!(attempt, message = %message, "Analysis failed");
                return Err(PollError::Failed(message));
            }
            Ok(AnalysisOutcome::Processing { .. }) => {
                tracing::debug!(attempt, max_attempts = policy.max_attempts, "Still processing");
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Result check failed, retrying");
            }
        }
    }

    Err(PollError::TimedOut {
        attempts: policy.max_attempts,
    })
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), PollError> {
    if cancel.is_cancelled() {
        return Err(PollError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(PollError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
