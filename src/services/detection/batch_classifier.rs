// Batch Classifier
// Classifies a batch of reviews with one vectorized model call, then asks the
// LLM to explain each review flagged fake. Explanation calls fan out with
// bounded concurrency and are reassembled by index.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::models::{ClassificationResult, ExplanationRecord, ReviewInput, FAKE_CLASS};
use crate::services::classifier::{ClassifierError, ReviewClassifier};
use crate::services::config_store::DetectionConfig;
use crate::services::providers::ProviderError;

use super::explanation_client::ExplanationClient;
use super::explanation_parser::parse_explanation;

/// What happens to the batch when one explanation call fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProviderFailurePolicy {
    /// The whole batch fails
    #[default]
    FailBatch,
    /// Only the failing review gets the "Analysis Failed" placeholder
    Degrade,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub explain_concurrency: usize,
    pub on_provider_error: ProviderFailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for BatchOptions {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            explain_concurrency: config.explain_concurrency,
            on_provider_error: config.on_provider_error,
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("batch contains no reviews")]
    EmptyBatch,
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("explanation for review {index} failed: {source}")]
    Provider {
        index: usize,
        #[source]
        source: ProviderError,
    },
    #[error("explanation task failed: {0}")]
    Task(String),
}

pub struct BatchClassifier {
    model: Arc<dyn ReviewClassifier>,
    explainer: Arc<dyn ExplanationClient>,
    options: BatchOptions,
}

impl BatchClassifier {
    pub fn new(
        model: Arc<dyn ReviewClassifier>,
        explainer: Arc<dyn ExplanationClient>,
        options: BatchOptions,
    ) -> Self {
        Self {
            model,
            explainer,
            options,
        }
    }

    /// Classify every review; output has the input's length and order
    pub async fn classify(
        &self,
        reviews: &[ReviewInput],
    ) -> Result<Vec<ClassificationResult>, BatchError> {
        if reviews.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let started = Instant::now();
        let texts: Vec<String> = reviews.iter().map(|r| r.text().to_string()).collect();

        // Vectorizing a large batch is CPU-bound; keep it off the async workers
        let model = self.model.clone();
        let (texts, inference) = tokio::task::spawn_blocking(move || {
            let inference = model
                .predict(&texts)
                .and_then(|predictions| Ok((predictions, model.predict_proba(&texts)?)));
            (texts, inference)
        })
        .await
        .map_err(|e| BatchError::Task(e.to_string()))?;
        let (predictions, probabilities) = inference?;
        check_rows(texts.len(), predictions.len())?;
        check_rows(texts.len(), probabilities.len())?;

        let confidences = probabilities
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .cloned()
                    .reduce(f64::max)
                    .ok_or(ClassifierError::EmptyProbabilities(i))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let flagged: Vec<usize> = predictions
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == FAKE_CLASS)
            .map(|(i, _)| i)
            .collect();

        let mut explanations = self.explain_flagged(&texts, &flagged).await?;

        let results: Vec<ClassificationResult> = predictions
            .iter()
            .zip(confidences)
            .enumerate()
            .map(|(i, (prediction, confidence))| {
                let is_fake = *prediction == FAKE_CLASS;
                let explanation = if is_fake {
                    explanations[i].take().unwrap_or_else(ExplanationRecord::failed)
                } else {
                    ExplanationRecord::genuine()
                };
                ClassificationResult::new(is_fake, confidence, explanation)
            })
            .collect();

        info!(
            "[BATCH] reviews={} flagged={} elapsed_ms={}",
            results.len(),
            flagged.len(),
            started.elapsed().as_millis()
        );
        Ok(results)
    }

    /// One explanation per flagged index, stored at that index
    async fn explain_flagged(
        &self,
        texts: &[String],
        flagged: &[usize],
    ) -> Result<Vec<Option<ExplanationRecord>>, BatchError> {
        let mut explanations: Vec<Option<ExplanationRecord>> = vec![None; texts.len()];
        if flagged.is_empty() {
            return Ok(explanations);
        }

        let semaphore = Arc::new(Semaphore::new(
            self.options
                .explain_concurrency
                .clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut join_set: JoinSet<(usize, Result<String, ProviderError>)> = JoinSet::new();

        for &index in flagged {
            let explainer = self.explainer.clone();
            let semaphore = semaphore.clone();
            let text = texts[index].clone();

            join_set.spawn(async move {
                // The semaphore is never closed while tasks are alive
                let _permit = semaphore.acquire_owned().await.ok();
                (index, explainer.explain(&text).await)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (index, outcome) = joined.map_err(|e| BatchError::Task(e.to_string()))?;
            match outcome {
                Ok(raw) => explanations[index] = Some(parse_explanation(&raw)),
                Err(e) => match self.options.on_provider_error {
                    ProviderFailurePolicy::FailBatch => {
                        join_set.abort_all();
                        return Err(BatchError::Provider { index, source: e });
                    }
                    ProviderFailurePolicy::Degrade => {
                        warn!("[BATCH] explanation for review {} failed: {}", index, e);
                        explanations[index] = Some(ExplanationRecord::failed());
                    }
                },
            }
        }

        Ok(explanations)
    }
}

fn check_rows(expected: usize, got: usize) -> Result<(), ClassifierError> {
    if expected == got {
        Ok(())
    } else {
        Err(ClassifierError::ShapeMismatch { expected, got })
    }
}
