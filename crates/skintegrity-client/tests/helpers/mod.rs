#![allow(dead_code)]

use async_trait::async_trait;
use skintegrity_client::{
    AnalysisSession, GatewayError, InferenceGateway, PollPolicy, SelectedVideo, VideoValidator,
};
use skintegrity_core::{AnalysisOutcome, Config, ScannerConfig};
use skintegrity_db::{InMemoryResultStore, Settlement};
use skintegrity_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const BUCKET_URL: &str = "https://bucket.example.com";

/// Object storage kept in memory, with failure switches.
#[derive(Clone, Default)]
pub struct FakeStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_uploads: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
    fail_urls: Arc<AtomicBool>,
    uploads: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_urls(&self) {
        self.fail_urls.store(true, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("simulated upload failure".to_string()));
        }
        self.objects
            .lock()
            .await
            .insert(storage_key.to_string(), data);
        Ok(format!("{}/{}", BUCKET_URL, storage_key))
    }

    fn public_url(&self, storage_key: &str) -> StorageResult<String> {
        if self.fail_urls.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("simulated URL failure".to_string()));
        }
        Ok(format!("{}/{}", BUCKET_URL, storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("simulated delete failure".to_string()));
        }
        self.objects.lock().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().await.contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Scanner API stand-in answering from scripted outcomes.
#[derive(Clone)]
pub struct FakeGateway {
    trigger: Arc<Mutex<Result<AnalysisOutcome, (u16, String)>>>,
    polls: Arc<Mutex<VecDeque<AnalysisOutcome>>>,
    triggered: Arc<Mutex<Vec<String>>>,
    poll_calls: Arc<AtomicUsize>,
    settles: Option<(InMemoryResultStore, u32, Settlement)>,
}

impl FakeGateway {
    pub fn answering(outcome: AnalysisOutcome) -> Self {
        Self::with_trigger(Ok(outcome))
    }

    pub fn rejecting(status: u16, message: &str) -> Self {
        Self::with_trigger(Err((status, message.to_string())))
    }

    fn with_trigger(trigger: Result<AnalysisOutcome, (u16, String)>) -> Self {
        Self {
            trigger: Arc::new(Mutex::new(trigger)),
            polls: Arc::new(Mutex::new(VecDeque::new())),
            triggered: Arc::new(Mutex::new(Vec::new())),
            poll_calls: Arc::new(AtomicUsize::new(0)),
            settles: None,
        }
    }

    /// Like the inference service writing its verdict: once triggered, the
    /// row reads pending `pending_reads` times, then settles.
    pub fn settling(store: &InMemoryResultStore, pending_reads: u32, settlement: Settlement) -> Self {
        Self {
            settles: Some((store.clone(), pending_reads, settlement)),
            ..Self::answering(AnalysisOutcome::processing(None))
        }
    }

    /// Outcomes returned by successive poll calls; processing once exhausted.
    pub async fn script_polls(&self, outcomes: Vec<AnalysisOutcome>) {
        *self.polls.lock().await = outcomes.into();
    }

    pub async fn triggered_urls(&self) -> Vec<String> {
        self.triggered.lock().await.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceGateway for FakeGateway {
    async fn process_video(&self, video_url: &str) -> Result<AnalysisOutcome, GatewayError> {
        self.triggered.lock().await.push(video_url.to_string());
        if let Some((store, pending_reads, settlement)) = &self.settles {
            store
                .settle_after(video_url, *pending_reads, settlement.clone())
                .await;
        }
        match &*self.trigger.lock().await {
            Ok(outcome) => Ok(outcome.clone()),
            Err((status, message)) => Err(GatewayError::Rejected {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    async fn poll_result(&self, _poll_url: &str) -> Result<AnalysisOutcome, GatewayError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .polls
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| AnalysisOutcome::processing(None)))
    }
}

pub fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        interval: Duration::from_millis(5),
        initial_delay: Duration::ZERO,
        delay_per_mb: Duration::ZERO,
    }
}

pub fn session(storage: &FakeStorage, gateway: &FakeGateway, max_attempts: u32) -> AnalysisSession {
    let config = Config::new(ScannerConfig::default());
    AnalysisSession::new(
        Arc::new(storage.clone()),
        Arc::new(gateway.clone()),
        VideoValidator::from_config(&config),
        fast_policy(max_attempts),
    )
}

pub fn sample_video() -> SelectedVideo {
    SelectedVideo::new("interview.mp4", vec![7u8; 4096], "video/mp4")
}
