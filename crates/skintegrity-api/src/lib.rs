//! Skintegrity API Library
//!
//! HTTP front of the inference service: the trigger endpoint that submits a
//! video URL, the poll relay, health checks and the OpenAPI description.

mod api_doc;
pub mod error;
mod handlers;
pub mod inference;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use inference::{InferenceClient, InferenceError, TriggerResponse, UpstreamResponse};
pub use state::AppState;
