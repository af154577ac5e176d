// Explanation Client
// Asks the LLM provider why a flagged review looks fake

use async_trait::async_trait;
use tracing::info;

use crate::services::providers::{ProviderClient, ProviderError};

/// Categories the LLM is asked to choose from
pub const REASON_CATEGORIES: [&str; 3] = [
    "AI-Generated Language",
    "Promotional Spam",
    "Generic/Unhelpful",
];

/// Produces raw free-text explanations for flagged reviews.
/// Errors are returned as-is; no retry happens here.
#[async_trait]
pub trait ExplanationClient: Send + Sync {
    async fn explain(&self, review_text: &str) -> Result<String, ProviderError>;
}

/// Deterministic prompt embedding the raw review text
pub fn build_prompt(review_text: &str) -> String {
    format!(
        "You are an expert at detecting inauthentic online reviews. The following review has been \
flagged as potentially fake by a machine learning model.\n\
Analyze the review and provide a concise, one-sentence reason for why it is suspicious. \
Categorize your reason into one of the following: '{}', '{}', or '{}'.\n\
\n\
Review: \"{}\"\n\
\n\
Respond ONLY with a valid JSON object with \"reason_category\" and \"reason_description\" keys.",
        REASON_CATEGORIES[0], REASON_CATEGORIES[1], REASON_CATEGORIES[2], review_text
    )
}

/// ExplanationClient backed by the configured LLM provider
pub struct LlmExplainer {
    client: ProviderClient,
}

impl LlmExplainer {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExplanationClient for LlmExplainer {
    async fn explain(&self, review_text: &str) -> Result<String, ProviderError> {
        let prompt = build_prompt(review_text);
        let result = self.client.complete(&prompt).await?;
        info!(
            "[EXPLAIN] model={} latency_ms={} chars={}",
            self.client.settings().model_id,
            result.latency_ms,
            result.content.len()
        );
        Ok(result.content)
    }
}
