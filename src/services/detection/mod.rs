// Detection Module
// Fake review detection core organized into specialized submodules:
// - batch_classifier: one model call per batch plus per-review explanations
// - explanation_client: prompt building and the LLM-backed explainer
// - explanation_parser: defensive parsing of LLM output
// - summary: trust score, flags, filtering and de-duplication for clients

pub mod batch_classifier;
pub mod explanation_client;
pub mod explanation_parser;
pub mod summary;

pub use batch_classifier::{BatchClassifier, BatchError, BatchOptions, ProviderFailurePolicy};
pub use explanation_client::{build_prompt, ExplanationClient, LlmExplainer, REASON_CATEGORIES};
pub use explanation_parser::parse_explanation;
pub use summary::{
    dedupe_reviews, drop_non_review_content, is_non_review_content, BatchSummary, ScannedReview,
    SuspiciousReview,
};
