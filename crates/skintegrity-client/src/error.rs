//! Client-side errors. `Display` is the message shown to the user.

use crate::validate::ValidationError;
use skintegrity_core::AppError;
use skintegrity_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Analysis timed out after {attempts} attempts.")]
    TimedOut { attempts: u32 },

    #[error("Analysis was cancelled.")]
    Cancelled,

    /// The inference service reported a failure.
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Please select a video to upload.")]
    NoVideoSelected,

    #[error(transparent)]
    InvalidVideo(#[from] ValidationError),

    #[error("Failed to upload video.")]
    Upload(#[source] StorageError),

    #[error("Failed to retrieve video URL.")]
    VideoUrl(#[source] StorageError),

    #[error("An unexpected error occurred.")]
    ResultStore(#[source] AppError),

    /// The scanner API refused or could not forward the video.
    #[error("{0}")]
    Trigger(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("An unexpected error occurred.")]
    Unexpected(#[source] anyhow::Error),
}

impl ClientError {
    /// Message for the result view.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
