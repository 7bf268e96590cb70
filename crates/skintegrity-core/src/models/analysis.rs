use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Verdict returned by the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Real,
    Deepfake,
}

impl Classification {
    /// Match an upstream label case-insensitively.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "REAL" | "AUTHENTIC" => Some(Classification::Real),
            "DEEPFAKE" | "FAKE" => Some(Classification::Deepfake),
            _ => None,
        }
    }

    pub fn is_authentic(&self) -> bool {
        matches!(self, Classification::Real)
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Classification::Real => write!(f, "REAL"),
            Classification::Deepfake => write!(f, "DEEPFAKE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfidenceError {
    #[error("Confidence is not a finite number")]
    NotFinite,

    #[error("Confidence {0} is outside 0..=100")]
    OutOfRange(f64),
}

/// Model confidence as a fraction in `0..=1`.
///
/// Upstream revisions report either a fraction or a percentage; values in
/// `(1, 100]` are read as percentages.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn from_fraction(value: f64) -> Result<Self, ConfidenceError> {
        if !value.is_finite() {
            return Err(ConfidenceError::NotFinite);
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfidenceError::OutOfRange(value));
        }
        Ok(Confidence(value))
    }

    /// Accept either a fraction or a percentage.
    pub fn normalize(raw: f64) -> Result<Self, ConfidenceError> {
        if !raw.is_finite() {
            return Err(ConfidenceError::NotFinite);
        }
        if raw > 1.0 && raw <= 100.0 {
            return Ok(Confidence(raw / 100.0));
        }
        Self::from_fraction(raw)
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }

    pub fn percent(&self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::normalize(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// A completed analysis: label plus normalized confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    #[serde(alias = "prediction")]
    pub classification: Classification,
    #[schema(value_type = f64)]
    pub confidence: Confidence,
}

const LABEL_KEYS: [&str; 4] = ["classification", "prediction", "label", "result"];
const CONFIDENCE_KEYS: [&str; 3] = ["confidence", "score", "probability"];

fn number_field(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

impl ClassificationResult {
    /// Extract a result from one of the upstream JSON shapes.
    ///
    /// Accepts `classification`/`prediction`/`label`/`result` for the label and
    /// `confidence`/`score`/`probability` for the confidence, either at the top
    /// level or inside a nested `result` object.
    pub fn from_upstream(body: &JsonValue) -> Option<Self> {
        let object = body.as_object()?;

        if let Some(nested) = object.get("result").filter(|v| v.is_object()) {
            if let Some(result) = Self::from_upstream(nested) {
                return Some(result);
            }
        }

        let classification = LABEL_KEYS
            .iter()
            .filter_map(|key| object.get(*key).and_then(JsonValue::as_str))
            .find_map(Classification::parse_label)?;

        let confidence = CONFIDENCE_KEYS
            .iter()
            .filter_map(|key| object.get(*key).and_then(number_field))
            .find_map(|raw| Confidence::normalize(raw).ok())?;

        Some(ClassificationResult {
            classification,
            confidence,
        })
    }
}

/// The single contract between the trigger/poll endpoints and their callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Not finished. `poll_url` is set when the caller should poll over HTTP.
    Processing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poll_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Completed {
        #[serde(alias = "prediction")]
        classification: Classification,
        #[schema(value_type = f64)]
        confidence: Confidence,
    },
    Failed { message: String },
}

impl AnalysisOutcome {
    pub fn processing(poll_url: Option<String>) -> Self {
        AnalysisOutcome::Processing {
            poll_url,
            message: None,
        }
    }

    pub fn completed(result: ClassificationResult) -> Self {
        AnalysisOutcome::Completed {
            classification: result.classification,
            confidence: result.confidence,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        AnalysisOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisOutcome::Processing { .. })
    }

    pub fn result(&self) -> Option<ClassificationResult> {
        match self {
            AnalysisOutcome::Completed {
                classification,
                confidence,
            } => Some(ClassificationResult {
                classification: *classification,
                confidence: *confidence,
            }),
            _ => None,
        }
    }

    /// Normalize an upstream JSON body.
    ///
    /// An explicit `status` field wins (`completed`/`success`, `failed`/`error`,
    /// `pending`/`processing`); otherwise a body carrying a label and a
    /// confidence is read as completed. Returns `None` for unrecognized shapes.
    pub fn from_upstream(body: &JsonValue) -> Option<Self> {
        let status = body
            .get("status")
            .and_then(JsonValue::as_str)
            .map(|s| s.trim().to_lowercase());

        match status.as_deref() {
            Some("completed") | Some("complete") | Some("success") | Some("succeeded")
            | Some("done") => ClassificationResult::from_upstream(body).map(Self::completed),
            Some("failed") | Some("failure") | Some("error") => {
                let message = ["message", "error", "detail"]
                    .iter()
                    .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
                    .unwrap_or("Analysis failed")
                    .to_string();
                Some(Self::failed(message))
            }
            Some("pending") | Some("processing") | Some("queued") | Some("running") => {
                Some(AnalysisOutcome::Processing {
                    poll_url: body
                        .get("poll_url")
                        .and_then(JsonValue::as_str)
                        .map(String::from),
                    message: body
                        .get("message")
                        .and_then(JsonValue::as_str)
                        .map(String::from),
                })
            }
            _ => ClassificationResult::from_upstream(body).map(Self::completed),
        }
    }
}
