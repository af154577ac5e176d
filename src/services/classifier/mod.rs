// Review Classifier
// The loaded fake-review model and its process-wide slot:
// - linear: TF-IDF + linear classifier loaded from an exported artifact
// - artifact_store: retrieves the artifact from local disk or an object store

pub mod artifact_store;
pub mod linear;

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub use artifact_store::{fetch_artifact, load_model, ModelSource};
pub use linear::{LinearTextModel, ModelArtifact, Norm, VectorizerArtifact};

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("artifact download failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("artifact store returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("artifact is inconsistent: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ClassifierError {
    #[error("classifier returned {got} rows for {expected} inputs")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("empty probability vector at index {0}")]
    EmptyProbabilities(usize),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A batch text classifier. Both calls are vectorized and keep input order.
pub trait ReviewClassifier: Send + Sync {
    /// Class labels in probability-vector order
    fn classes(&self) -> &[i64];

    fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifierError>;

    fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ClassifierError>;
}

/// Process-wide classifier, loaded once at startup and read-only afterwards.
#[derive(Clone)]
pub enum ModelSlot {
    Loaded(Arc<dyn ReviewClassifier>),
    Unavailable { reason: String },
}

impl ModelSlot {
    pub fn loaded(model: impl ReviewClassifier + 'static) -> Self {
        ModelSlot::Loaded(Arc::new(model))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelSlot::Unavailable {
            reason: reason.into(),
        }
    }

    /// Load the model from its source. Failure is logged and yields an
    /// unavailable slot; the caller keeps running.
    pub async fn load(source: &ModelSource, client: &reqwest::Client) -> Self {
        info!("[MODEL] Loading classifier from {}", source.describe());
        match load_model(source, client).await {
            Ok(model) => {
                info!(
                    "[MODEL] Classifier loaded: classes={:?} features={}",
                    model.classes(),
                    model.feature_count()
                );
                Self::loaded(model)
            }
            Err(e) => {
                error!("[MODEL] FATAL: could not load classifier: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn get(&self) -> Option<&Arc<dyn ReviewClassifier>> {
        match self {
            ModelSlot::Loaded(model) => Some(model),
            ModelSlot::Unavailable { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelSlot::Loaded(_))
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSlot::Loaded(model) => f
                .debug_struct("Loaded")
                .field("classes", &model.classes())
                .finish(),
            ModelSlot::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant;

    impl ReviewClassifier for Constant {
        fn classes(&self) -> &[i64] {
            &[0, 1]
        }

        fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifierError> {
            Ok(vec![0; texts.len()])
        }

        fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ClassifierError> {
            Ok(vec![vec![0.9, 0.1]; texts.len()])
        }
    }

    #[test]
    fn test_slot_states() {
        let slot = ModelSlot::loaded(Constant);
        assert!(slot.is_loaded());
        assert!(slot.get().is_some());

        let slot = ModelSlot::unavailable("missing artifact");
        assert!(!slot.is_loaded());
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_yields_unavailable_slot() {
        let source = ModelSource::Local {
            path: "/definitely/not/here/model.json".into(),
        };
        let slot = ModelSlot::load(&source, &reqwest::Client::new()).await;
        match slot {
            ModelSlot::Unavailable { reason } => assert!(reason.contains("I/O")),
            ModelSlot::Loaded(_) => panic!("load should fail"),
        }
    }
}
