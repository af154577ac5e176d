// ReviewTrust Core Services

pub mod classifier;
pub mod config_store;
pub mod detection;
pub mod providers;
pub mod text_processor;

pub use config_store::*;
pub use providers::*;

pub use classifier::{LinearTextModel, ModelLoadError, ModelSlot, ModelSource, ReviewClassifier};
pub use detection::{
    build_prompt,
    dedupe_reviews,
    drop_non_review_content,
    parse_explanation,
    BatchClassifier,
    BatchError,
    BatchOptions,
    BatchSummary,
    ExplanationClient,
    LlmExplainer,
    ProviderFailurePolicy,
    ScannedReview,
};
