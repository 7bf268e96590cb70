use async_trait::async_trait;
use skintegrity_core::{AppError, ResultRecord, ResultStatus};
use sqlx::{PgPool, Postgres};

const SELECT_COLUMNS: &str =
    "video_url, status, prediction, confidence, error_message, created_at, updated_at";

/// Access to the per-video result row.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a pending row, resetting any existing row for the same URL.
    async fn create_pending(&self, video_url: &str) -> Result<ResultRecord, AppError>;

    async fn get_by_video_url(&self, video_url: &str) -> Result<Option<ResultRecord>, AppError>;

    /// Mark the row completed. Normally done by the inference service.
    async fn complete(
        &self,
        video_url: &str,
        prediction: &str,
        confidence: f64,
    ) -> Result<Option<ResultRecord>, AppError>;

    /// Mark the row failed. Normally done by the inference service.
    async fn fail(&self, video_url: &str, message: &str)
        -> Result<Option<ResultRecord>, AppError>;

    /// Delete the row. Returns whether a row was removed.
    async fn delete(&self, video_url: &str) -> Result<bool, AppError>;
}

/// Postgres-backed [`ResultStore`] over `analysis_results`.
#[derive(Clone)]
pub struct AnalysisResultRepository {
    pool: PgPool,
}

impl AnalysisResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for AnalysisResultRepository {
    #[tracing::instrument(skip(self), fields(db.table = "analysis_results", db.operation = "upsert"))]
    async fn create_pending(&self, video_url: &str) -> Result<ResultRecord, AppError> {
        let record = sqlx::query_as::<Postgres, ResultRecord>(&format!(
            r#"
            INSERT INTO analysis_results (video_url, status)
            VALUES ($1, $2)
            ON CONFLICT (video_url) DO UPDATE
            SET status = EXCLUDED.status,
                prediction = NULL,
                confidence = NULL,
                error_message = NULL,
                created_at = NOW(),
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(video_url)
        .bind(ResultStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_results", db.operation = "select"))]
    async fn get_by_video_url(&self, video_url: &str) -> Result<Option<ResultRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ResultRecord>(&format!(
            "SELECT {} FROM analysis_results WHERE video_url = $1",
            SELECT_COLUMNS
        ))
        .bind(video_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_results", db.operation = "update"))]
    async fn complete(
        &self,
        video_url: &str,
        prediction: &str,
        confidence: f64,
    ) -> Result<Option<ResultRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ResultRecord>(&format!(
            r#"
            UPDATE analysis_results
            SET status = $2, prediction = $3, confidence = $4, error_message = NULL, updated_at = NOW()
            WHERE video_url = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(video_url)
        .bind(ResultStatus::Completed)
        .bind(prediction)
        .bind(confidence)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_results", db.operation = "update"))]
    async fn fail(
        &self,
        video_url: &str,
        message: &str,
    ) -> Result<Option<ResultRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ResultRecord>(&format!(
            r#"
            UPDATE analysis_results
            SET status = $2, error_message = $3, updated_at = NOW()
            WHERE video_url = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(video_url)
        .bind(ResultStatus::Failed)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_results", db.operation = "delete"))]
    async fn delete(&self, video_url: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM analysis_results WHERE video_url = $1")
            .bind(video_url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
