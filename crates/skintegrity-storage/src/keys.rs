//! Key generation for uploaded videos.

use skintegrity_core::constants::FALLBACK_VIDEO_EXTENSION;
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

/// Lower-cased extension of `filename`, or `None` when absent or not a plain
/// alphanumeric token.
pub fn video_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Generate a fresh key `{prefix}/{uuid}.{ext}` for an upload.
///
/// The original filename only contributes its extension.
pub fn generate_video_key(prefix: &str, original_filename: &str) -> String {
    let ext = video_extension(original_filename)
        .unwrap_or_else(|| FALLBACK_VIDEO_EXTENSION.to_string());
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}.{}", Uuid::new_v4(), ext)
    } else {
        format!("{}/{}.{}", prefix, Uuid::new_v4(), ext)
    }
}
