use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

use super::analysis::{AnalysisOutcome, Classification, ClassificationResult, Confidence};

/// Lifecycle of a result row, written by the inference service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "analysis_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for ResultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResultStatus::Pending => write!(f, "pending"),
            ResultStatus::Completed => write!(f, "completed"),
            ResultStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Row of `analysis_results`, keyed by the public video URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResultRecord {
    pub video_url: String,
    pub status: ResultStatus,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn pending(video_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            video_url: video_url.into(),
            status: ResultStatus::Pending,
            prediction: None,
            confidence: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Map the row onto the shared outcome type.
    ///
    /// A completed row whose prediction or confidence cannot be read is reported
    /// as failed, since it will never become readable by polling again.
    pub fn outcome(&self) -> AnalysisOutcome {
        match self.status {
            ResultStatus::Pending => AnalysisOutcome::processing(None),
            ResultStatus::Failed => AnalysisOutcome::failed(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "Analysis failed".to_string()),
            ),
            ResultStatus::Completed => {
                let classification = self
                    .prediction
                    .as_deref()
                    .and_then(Classification::parse_label);
                let confidence = self.confidence.map(Confidence::normalize);
                match (classification, confidence) {
                    (Some(classification), Some(Ok(confidence))) => {
                        AnalysisOutcome::completed(ClassificationResult {
                            classification,
                            confidence,
                        })
                    }
                    _ => AnalysisOutcome::failed("Result is missing a readable prediction"),
                }
            }
        }
    }
}
