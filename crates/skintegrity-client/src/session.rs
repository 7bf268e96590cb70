//! Analysis session: upload → trigger → poll → cleanup.
//!
//! A session owns the selected video, the observable [`SessionState`], the last
//! result and error message, and the cancellation token that bounds the poll
//! task. Every submission deletes its blob and result row exactly once, on
//! success, on failure and when the submission future is dropped mid-flight.

use crate::api::InferenceGateway;
use crate::error::{ClientError, PollError};
use crate::poller::{poll_until_terminal, HttpPollSource, PollPolicy, PollSource, RowPollSource};
use crate::validate::{content_type_for_extension, VideoValidator};
use skintegrity_core::constants::DEFAULT_STORAGE_KEY_PREFIX;
use skintegrity_core::{AnalysisOutcome, ClassificationResult, Config};
use skintegrity_db::ResultStore;
use skintegrity_storage::{generate_video_key, video_extension, Storage};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Uploading,
    Triggering,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Errored,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::TimedOut
                | SessionState::Errored
                | SessionState::Cancelled
        )
    }

    fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Poll(PollError::TimedOut { .. }) => SessionState::TimedOut,
            ClientError::Poll(PollError::Cancelled) => SessionState::Cancelled,
            ClientError::Poll(PollError::Failed(_)) => SessionState::Failed,
            _ => SessionState::Errored,
        }
    }
}

/// Where the poller looks for the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PollStrategy {
    /// Read the result row keyed by the video URL.
    Row,
    /// Ask the poll relay about the poll URL returned by the trigger.
    Http,
}

#[derive(Debug, Clone)]
pub struct SelectedVideo {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl SelectedVideo {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Read a video from disk, deriving the content type from its extension.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        let content_type = video_extension(&name)
            .map(|ext| content_type_for_extension(&ext))
            .unwrap_or("application/octet-stream");

        Ok(Self::new(name, bytes, content_type))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Blob and row created by one submission.
struct Cleanup {
    storage: Arc<dyn Storage>,
    results: Option<Arc<dyn ResultStore>>,
    storage_key: Option<String>,
    video_url: Option<String>,
    done: bool,
}

impl Cleanup {
    fn new(storage: Arc<dyn Storage>, results: Option<Arc<dyn ResultStore>>) -> Self {
        Self {
            storage,
            results,
            storage_key: None,
            video_url: None,
            done: false,
        }
    }

    /// Delete whatever was registered. Later calls do nothing.
    async fn run(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        if let Some(key) = self.storage_key.take() {
            match self.storage.delete(&key).await {
                Ok(()) => tracing::debug!(storage_key = %key, "Deleted uploaded video"),
                Err(e) => {
                    tracing::warn!(storage_key = %key, error = %e, "Failed to delete uploaded video")
                }
            }
        }

        if let (Some(store), Some(url)) = (&self.results, self.video_url.take()) {
            if let Err(e) = store.delete(&url).await {
                tracing::warn!(video_url = %url, error = %e, "Failed to delete result row");
            }
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if self.done || (self.storage_key.is_none() && self.video_url.is_none()) {
            return;
        }
        self.done = true;

        let mut pending = Cleanup {
            storage: self.storage.clone(),
            results: self.results.clone(),
            storage_key: self.storage_key.take(),
            video_url: self.video_url.take(),
            done: false,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pending.run().await });
            }
            Err(_) => {
                pending.done = true;
                tracing::warn!(
                    storage_key = ?pending.storage_key,
                    "No runtime available, uploaded video was not deleted"
                );
            }
        }
    }
}

async fn or_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, ClientError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PollError::Cancelled.into()),
        output = future => Ok(output),
    }
}

pub struct AnalysisSession {
    storage: Arc<dyn Storage>,
    gateway: Arc<dyn InferenceGateway>,
    results: Option<Arc<dyn ResultStore>>,
    validator: VideoValidator,
    policy: PollPolicy,
    strategy: PollStrategy,
    key_prefix: String,
    video: Option<SelectedVideo>,
    result: Option<ClassificationResult>,
    error: Option<String>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
}

impl AnalysisSession {
    /// Session using the HTTP poll strategy and no result store.
    pub fn new(
        storage: Arc<dyn Storage>,
        gateway: Arc<dyn InferenceGateway>,
        validator: VideoValidator,
        policy: PollPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            storage,
            gateway,
            results: None,
            validator,
            policy,
            strategy: PollStrategy::Http,
            key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            video: None,
            result: None,
            error: None,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        gateway: Arc<dyn InferenceGateway>,
    ) -> Self {
        Self::new(
            storage,
            gateway,
            VideoValidator::from_config(config),
            PollPolicy::from_config(config),
        )
        .with_key_prefix(config.storage_key_prefix())
    }

    /// Poll the result row instead of the poll relay.
    pub fn with_result_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.results = Some(store);
        self.strategy = PollStrategy::Row;
        self
    }

    pub fn with_strategy(mut self, strategy: PollStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn video(&self) -> Option<&SelectedVideo> {
        self.video.as_ref()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Token cancelled by [`teardown`](Self::teardown). Replaced on `reset`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn set_state(&self, state: SessionState) {
        tracing::debug!(?state, "Session state changed");
        self.state.send_replace(state);
    }

    /// Validate and store a selection. Clears the previous result and error.
    pub fn select_video(&mut self, video: SelectedVideo) -> Result<(), ClientError> {
        self.result = None;
        self.error = None;

        if let Err(e) = self
            .validator
            .validate(&video.name, video.size(), &video.content_type)
        {
            let err = ClientError::from(e);
            self.error = Some(err.user_message());
            self.video = None;
            return Err(err);
        }

        self.video = Some(video);
        Ok(())
    }

    /// Run the whole flow for the selected video.
    pub async fn submit(&mut self) -> Result<ClassificationResult, ClientError> {
        self.result = None;
        self.error = None;

        let Some(video) = self.video.clone() else {
            return Err(self.finish_with_error(ClientError::NoVideoSelected));
        };

        let cancel = self.cancel.child_token();
        let mut cleanup = Cleanup::new(self.storage.clone(), self.results.clone());

        let outcome = self.run(&video, &mut cleanup, &cancel).await;
        cleanup.run().await;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    classification = %result.classification,
                    confidence = result.confidence.fraction(),
                    "Analysis finished"
                );
                self.result = Some(result);
                self.set_state(SessionState::Completed);
                Ok(result)
            }
            Err(err) => Err(self.finish_with_error(err)),
        }
    }

    fn finish_with_error(&mut self, err: ClientError) -> ClientError {
        tracing::warn!(error = ?err, "Analysis did not complete");
        self.error = Some(err.user_message());
        self.set_state(SessionState::from_error(&err));
        err
    }

    async fn run(
        &self,
        video: &SelectedVideo,
        cleanup: &mut Cleanup,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, ClientError> {
        self.set_state(SessionState::Uploading);

        let key = generate_video_key(&self.key_prefix, &video.name);
        cleanup.storage_key = Some(key.clone());
        or_cancelled(
            cancel,
            self.storage
                .upload_with_key(&key, video.bytes.clone(), &video.content_type),
        )
        .await?
        .map_err(ClientError::Upload)?;

        let video_url = self.storage.public_url(&key).map_err(ClientError::VideoUrl)?;
        tracing::info!(storage_key = %key, video_url = %video_url, "Video uploaded");

        let store = match self.strategy {
            PollStrategy::Row => {
                let store = self.results.clone().ok_or_else(|| {
                    ClientError::Unexpected(anyhow::anyhow!(
                        "Row polling requires a result store"
                    ))
                })?;
                cleanup.video_url = Some(video_url.clone());
                or_cancelled(cancel, store.create_pending(&video_url))
                    .await?
                    .map_err(ClientError::ResultStore)?;
                Some(store)
            }
            PollStrategy::Http => None,
        };

        self.set_state(SessionState::Triggering);
        let outcome = or_cancelled(cancel, self.gateway.process_video(&video_url))
            .await?
            .map_err(|e| ClientError::Trigger(e.to_string()))?;

        let poll_url = match outcome {
            AnalysisOutcome::Completed {
                classification,
                confidence,
            } => {
                return Ok(ClassificationResult {
                    classification,
                    confidence,
                })
            }
            AnalysisOutcome::Failed { message } => return Err(PollError::Failed(message).into()),
            AnalysisOutcome::Processing { poll_url, .. } => poll_url,
        };

        self.set_state(SessionState::Polling);
        let source: Box<dyn PollSource> = match (store, poll_url) {
            (Some(store), _) => Box::new(RowPollSource::new(store, video_url)),
            (None, Some(poll_url)) => Box::new(HttpPollSource::new(self.gateway.clone(), poll_url)),
            (None, None) => {
                return Err(ClientError::Trigger(
                    "Scanner API did not return a poll URL".to_string(),
                ))
            }
        };

        let initial_delay = self.policy.initial_delay_for(video.size());
        Ok(poll_until_terminal(source.as_ref(), &self.policy, initial_delay, cancel).await?)
    }

    /// Return every client-visible field to its initial value.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.video = None;
        self.result = None;
        self.error = None;
        self.set_state(SessionState::Idle);
    }

    /// Cancel any in-flight poll.
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Tearing down analysis session");
            self.cancel.cancel();
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
