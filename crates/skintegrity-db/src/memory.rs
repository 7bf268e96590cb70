//! In-memory [`ResultStore`] for tests and local runs without Postgres.
//!
//! Besides plain storage it can script how the inference service settles a row
//! (`settle_after`) and inject transient read failures.

use crate::results::ResultStore;
use async_trait::async_trait;
use chrono::Utc;
use skintegrity_core::{AppError, ResultRecord, ResultStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Terminal state a scripted row moves to.
#[derive(Debug, Clone)]
pub enum Settlement {
    Completed { prediction: String, confidence: f64 },
    Failed { message: String },
}

#[derive(Debug, Clone)]
struct Script {
    pending_reads: u32,
    settlement: Settlement,
}

#[derive(Clone, Default)]
pub struct InMemoryResultStore {
    rows: Arc<Mutex<HashMap<String, ResultRecord>>>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    failing_reads: Arc<Mutex<u32>>,
    fail_deletes: Arc<Mutex<bool>>,
    reads: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the row as pending for `pending_reads` reads, then apply `settlement`.
    pub async fn settle_after(&self, video_url: &str, pending_reads: u32, settlement: Settlement) {
        self.scripts.lock().await.insert(
            video_url.to_string(),
            Script {
                pending_reads,
                settlement,
            },
        );
    }

    /// Make the next `count` reads fail with a database error.
    pub async fn fail_next_reads(&self, count: u32) {
        *self.failing_reads.lock().await = count;
    }

    pub async fn fail_deletes(&self) {
        *self.fail_deletes.lock().await = true;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn contains(&self, video_url: &str) -> bool {
        self.rows.lock().await.contains_key(video_url)
    }

    fn apply(row: &mut ResultRecord, settlement: &Settlement) {
        match settlement {
            Settlement::Completed {
                prediction,
                confidence,
            } => {
                row.status = ResultStatus::Completed;
                row.prediction = Some(prediction.clone());
                row.confidence = Some(*confidence);
                row.error_message = None;
            }
            Settlement::Failed { message } => {
                row.status = ResultStatus::Failed;
                row.error_message = Some(message.clone());
            }
        }
        row.updated_at = Utc::now();
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn create_pending(&self, video_url: &str) -> Result<ResultRecord, AppError> {
        let record = ResultRecord::pending(video_url);
        self.rows
            .lock()
            .await
            .insert(video_url.to_string(), record.clone());
        Ok(record)
    }

    async fn get_by_video_url(&self, video_url: &str) -> Result<Option<ResultRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        {
            let mut failing = self.failing_reads.lock().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(AppError::Database(sqlx::Error::Protocol(
                    "simulated read failure".to_string(),
                )));
            }
        }

        let mut rows = self.rows.lock().await;
        let Some(row) = rows.get_mut(video_url) else {
            return Ok(None);
        };

        let mut scripts = self.scripts.lock().await;
        if let Some(script) = scripts.get_mut(video_url) {
            if script.pending_reads == 0 {
                Self::apply(row, &script.settlement);
                scripts.remove(video_url);
            } else {
                script.pending_reads -= 1;
            }
        }

        Ok(Some(row.clone()))
    }

    async fn complete(
        &self,
        video_url: &str,
        prediction: &str,
        confidence: f64,
    ) -> Result<Option<ResultRecord>, AppError> {
        let mut rows = self.rows.lock().await;
        Ok(rows.get_mut(video_url).map(|row| {
            Self::apply(
                row,
                &Settlement::Completed {
                    prediction: prediction.to_string(),
                    confidence,
                },
            );
            row.clone()
        }))
    }

    async fn fail(
        &self,
        video_url: &str,
        message: &str,
    ) -> Result<Option<ResultRecord>, AppError> {
        let mut rows = self.rows.lock().await;
        Ok(rows.get_mut(video_url).map(|row| {
            Self::apply(
                row,
                &Settlement::Failed {
                    message: message.to_string(),
                },
            );
            row.clone()
        }))
    }

    async fn delete(&self, video_url: &str) -> Result<bool, AppError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if *self.fail_deletes.lock().await {
            return Err(AppError::Internal("simulated delete failure".to_string()));
        }
        Ok(self.rows.lock().await.remove(video_url).is_some())
    }
}
