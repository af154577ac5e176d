// ReviewTrust Data Models
// Request/response shapes shared by the API, the batch classifier and the CLI

use serde::{Deserialize, Serialize};

pub const LABEL_FAKE: &str = "Fake";
pub const LABEL_REAL: &str = "Real";

/// Classifier output class that marks a review as fake
pub const FAKE_CLASS: i64 = 1;

pub const GENUINE_CATEGORY: &str = "N/A";
pub const GENUINE_DESCRIPTION: &str = "This review appears to be genuine.";
pub const FAILED_CATEGORY: &str = "Analysis Failed";
pub const FAILED_DESCRIPTION: &str = "Could not generate a reason.";
pub const GENERAL_CATEGORY: &str = "General Analysis";

// ============ Request ============

/// One review in a detection request. Missing or null text is treated as "".
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReviewInput {
    #[serde(default)]
    pub review_text: Option<String>,
}

impl ReviewInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            review_text: Some(text.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.review_text.as_deref().unwrap_or("")
    }
}

// ============ Explanation ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplanationRecord {
    pub reason_category: String,
    pub reason_description: String,
}

impl ExplanationRecord {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            reason_category: category.into(),
            reason_description: description.into(),
        }
    }

    /// Explanation attached to reviews the classifier considers real
    pub fn genuine() -> Self {
        Self::new(GENUINE_CATEGORY, GENUINE_DESCRIPTION)
    }

    /// Placeholder used when no reason could be produced
    pub fn failed() -> Self {
        Self::new(FAILED_CATEGORY, FAILED_DESCRIPTION)
    }

    /// Verbatim LLM text under the generic category
    pub fn general(raw: &str) -> Self {
        Self::new(GENERAL_CATEGORY, raw.trim())
    }
}

// ============ Result ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub predicted_label: String,
    pub is_fake: u8,
    /// Max class probability, always rendered with four decimals
    pub confidence: String,
    pub reason_category: String,
    pub reason_description: String,
}

impl ClassificationResult {
    pub fn new(is_fake: bool, confidence: f64, explanation: ExplanationRecord) -> Self {
        Self {
            predicted_label: if is_fake { LABEL_FAKE } else { LABEL_REAL }.to_string(),
            is_fake: u8::from(is_fake),
            confidence: format_confidence(confidence),
            reason_category: explanation.reason_category,
            reason_description: explanation.reason_description,
        }
    }

    pub fn is_fake(&self) -> bool {
        self.is_fake == 1
    }
}

/// Format a probability as a fixed four-decimal string in [0, 1].
/// NaN is reported as zero confidence.
pub fn format_confidence(value: f64) -> String {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    format!("{:.4}", clamped)
}

// ============ Error Body ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}
