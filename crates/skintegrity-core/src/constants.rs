//! Shared constants.

/// Route of the inference trigger endpoint.
pub const PROCESS_VIDEO_PATH: &str = "/api/process-video";

/// Route of the poll relay endpoint.
pub const POLL_RESULT_PATH: &str = "/api/poll-result";

/// Key prefix under which uploaded videos are stored.
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "skintegrityvideos";

/// Extension used for storage keys when the original filename has none.
pub const FALLBACK_VIDEO_EXTENSION: &str = "bin";

/// Message returned when the trigger upstream exceeds its time budget.
pub const TRIGGER_TIMEOUT_MESSAGE: &str =
    "Video processing is taking too long. Please try with a shorter video.";
