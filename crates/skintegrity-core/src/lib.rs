//! Skintegrity Core Library
//!
//! Configuration, error types and the analysis domain models shared by the
//! storage, database, API and client crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ScannerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AnalysisOutcome, Classification, ClassificationResult, Confidence, ConfidenceError,
    ResultRecord, ResultStatus,
};
pub use storage_types::StorageBackend;
