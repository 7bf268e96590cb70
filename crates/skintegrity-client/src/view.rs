//! Presentation of a finished analysis.

use crate::session::SelectedVideo;
use serde::Serialize;
use skintegrity_core::{Classification, ClassificationResult, Confidence};

const MIB: f64 = 1024.0 * 1024.0;

/// Confidence as a percentage with one decimal, e.g. `92.0%`.
pub fn format_confidence(confidence: Confidence) -> String {
    format!("{:.1}%", confidence.percent())
}

/// `x.xx KB` below one MiB, `x.xx MB` otherwise.
pub fn format_file_size(bytes: usize) -> String {
    let bytes = bytes as f64;
    if bytes / MIB < 1.0 {
        format!("{:.2} KB", bytes / 1024.0)
    } else {
        format!("{:.2} MB", bytes / MIB)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub headline: &'static str,
    pub authentic: bool,
    pub classification: Classification,
    pub confidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl ResultView {
    pub fn new(result: &ClassificationResult, video: Option<&SelectedVideo>) -> Self {
        let authentic = result.classification.is_authentic();
        Self {
            headline: if authentic {
                "Authentic Video"
            } else {
                "Deepfake Detected"
            },
            authentic,
            classification: result.classification,
            confidence: format_confidence(result.confidence),
            file_name: video.map(|v| v.name.clone()),
            file_size: video.map(|v| format_file_size(v.bytes.len())),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}\nConfidence: {}", self.headline, self.confidence);
        if let (Some(name), Some(size)) = (&self.file_name, &self.file_size) {
            out.push_str(&format!("\nFile: {} ({})", name, size));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(classification: Classification, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            classification,
            confidence: Confidence::from_fraction(confidence).unwrap(),
        }
    }

    #[test]
    fn test_headlines() {
        let view = ResultView::new(&result(Classification::Real, 0.92), None);
        assert_eq!(view.headline, "Authentic Video");
        assert_eq!(view.confidence, "92.0%");

        let view = ResultView::new(&result(Classification::Deepfake, 0.4567), None);
        assert_eq!(view.headline, "Deepfake Detected");
        assert_eq!(view.confidence, "45.7%");
    }

    #[test]
    fn test_file_size_units() {
        assert_eq!(format_file_size(512), "0.50 KB");
        assert_eq!(format_file_size(1024 * 1024 - 1), "1024.00 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 + 512 * 1024), "5.50 MB");
    }

    #[test]
    fn test_render_includes_file() {
        let video = SelectedVideo::new("clip.mp4", vec![0u8; 2048], "video/mp4");
        let view = ResultView::new(&result(Classification::Real, 1.0), Some(&video));
        assert_eq!(
            view.render(),
            "Authentic Video\nConfidence: 100.0%\nFile: clip.mp4 (2.00 KB)"
        );
    }
}
