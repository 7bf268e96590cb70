//! Error types module
//!
//! All errors surfaced at the HTTP boundary are unified under [`AppError`],
//! which describes its own response characteristics through [`ErrorMetadata`].
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPSTREAM_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// The inference service did not answer within its time budget.
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// The inference service answered with a non-success status; the status is passed through.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The inference service answered with something that cannot be interpreted.
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Per-variant metadata: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::UpstreamTimeout(_) => (
            408,
            "UPSTREAM_TIMEOUT",
            true,
            Some("Try again with a shorter video"),
            false,
            LogLevel::Warn,
        ),
        AppError::Upstream { status, .. } => (
            *status,
            "UPSTREAM_ERROR",
            *status >= 500,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::UpstreamUnreachable(_) => (
            500,
            "UPSTREAM_UNREACHABLE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        AppError::BadGateway(_) => (
            502,
            "BAD_GATEWAY",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
            AppError::UpstreamTimeout(_) => "UpstreamTimeout",
            AppError::Upstream { .. } => "Upstream",
            AppError::UpstreamUnreachable(_) => "UpstreamUnreachable",
            AppError::BadGateway(_) => "BadGateway",
        }
    }

    /// Full message including the source chain, for non-production responses and logs.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
            AppError::UpstreamTimeout(ref msg) => msg.clone(),
            AppError::Upstream { ref message, .. } => message.clone(),
            AppError::UpstreamUnreachable(ref msg) => msg.clone(),
            AppError::BadGateway(ref msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_upstream_status_is_passed_through() {
        let err = AppError::Upstream {
            status: 422,
            message: "unsupported codec".to_string(),
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "unsupported codec");

        let err = AppError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_upstream_timeout_maps_to_408() {
        let err = AppError::UpstreamTimeout("too slow".to_string());
        assert_eq!(err.http_status_code(), 408);
        assert_eq!(err.client_message(), "too slow");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_request_and_gateway_statuses() {
        let cases = [
            (AppError::BadRequest("poll_url is required".to_string()), 400, "BAD_REQUEST"),
            (AppError::UpstreamUnreachable("reset".to_string()), 500, "UPSTREAM_UNREACHABLE"),
            (AppError::BadGateway("garbled".to_string()), 502, "BAD_GATEWAY"),
            (AppError::Internal("boom".to_string()), 500, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.http_status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_internal_hides_details() {
        let err = AppError::Internal("secret path /var/x".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.is_sensitive());
        assert!(err.detailed_message().contains("/var/x"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("connection reset");
        let err = AppError::InternalWithSource {
            message: "trigger failed".to_string(),
            source,
        };
        assert!(err.detailed_message().contains("Caused by: connection reset"));
    }
}
