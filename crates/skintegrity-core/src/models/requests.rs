use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/process-video`.
///
/// The field is optional so a missing value is reported as a 400 with a
/// readable message rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProcessVideoRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Body of `POST /api/poll-result`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PollResultRequest {
    #[serde(default)]
    pub poll_url: Option<String>,
}

/// Return the trimmed value when present and non-empty.
pub fn required_field(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
