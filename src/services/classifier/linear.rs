// Linear Text Model
// TF-IDF vectorizer followed by a linear (logistic) classifier, evaluated from
// an exported pipeline artifact

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{ClassifierError, ModelLoadError, ReviewClassifier};
use crate::services::text_processor::{tokenize, word_ngrams};

const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

/// Exported classifier pipeline as stored in the model bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub classes: Vec<i64>,
    pub vectorizer: VectorizerArtifact,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

fn default_true() -> bool { true }
fn default_ngram_range() -> (usize, usize) { (1, 1) }
fn default_norm() -> Option<Norm> { Some(Norm::L2) }
fn default_format_version() -> u32 { SUPPORTED_FORMAT_VERSION }

#[derive(Debug, Clone)]
pub struct LinearTextModel {
    classes: Vec<i64>,
    vectorizer: VectorizerArtifact,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LinearTextModel {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        Self::from_artifact(artifact)
    }

    /// Validate shapes and build the model
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        if artifact.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelLoadError::Invalid(format!(
                "unsupported format_version {}",
                artifact.format_version
            )));
        }
        if artifact.classes.len() < 2 {
            return Err(ModelLoadError::Invalid(
                "at least two classes are required".to_string(),
            ));
        }

        let (min_n, max_n) = artifact.vectorizer.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelLoadError::Invalid(format!(
                "bad ngram_range ({}, {})",
                min_n, max_n
            )));
        }

        let n_features = artifact.vectorizer.idf.len();
        if let Some((term, idx)) = artifact
            .vectorizer
            .vocabulary
            .iter()
            .find(|(_, idx)| **idx >= n_features)
        {
            return Err(ModelLoadError::Invalid(format!(
                "vocabulary term '{}' maps to column {} but only {} idf weights exist",
                term, idx, n_features
            )));
        }

        let expected_rows = if artifact.classes.len() == 2 { 1 } else { artifact.classes.len() };
        if artifact.coef.len() != expected_rows {
            return Err(ModelLoadError::Invalid(format!(
                "expected {} coefficient rows for {} classes, found {}",
                expected_rows,
                artifact.classes.len(),
                artifact.coef.len()
            )));
        }
        if artifact.intercept.len() != expected_rows {
            return Err(ModelLoadError::Invalid(format!(
                "expected {} intercepts, found {}",
                expected_rows,
                artifact.intercept.len()
            )));
        }
        if let Some(row) = artifact.coef.iter().find(|row| row.len() != n_features) {
            return Err(ModelLoadError::Invalid(format!(
                "coefficient row has {} columns, expected {}",
                row.len(),
                n_features
            )));
        }

        Ok(Self {
            classes: artifact.classes,
            vectorizer: artifact.vectorizer,
            coef: artifact.coef,
            intercept: artifact.intercept,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.vectorizer.idf.len()
    }

    /// Sparse TF-IDF vector for one document, sorted by column
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let v = &self.vectorizer;
        let tokens = tokenize(text, v.lowercase);
        let grams = word_ngrams(&tokens, v.ngram_range.0, v.ngram_range.1);

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in &grams {
            if let Some(&idx) = v.vocabulary.get(gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, count)| {
                let tf = if v.sublinear_tf { 1.0 + count.ln() } else { count };
                (idx, tf * v.idf[idx])
            })
            .collect();
        features.sort_by_key(|(idx, _)| *idx);

        let norm = match v.norm {
            Some(Norm::L2) => features.iter().map(|(_, x)| x * x).sum::<f64>().sqrt(),
            Some(Norm::L1) => features.iter().map(|(_, x)| x.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, x) in features.iter_mut() {
                *x /= norm;
            }
        }
        features
    }

    fn decision_function(&self, features: &[(usize, f64)]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(self.intercept.iter())
            .map(|(row, b)| b + features.iter().map(|(idx, x)| row[*idx] * x).sum::<f64>())
            .collect()
    }

    /// Binary models pick the positive class for any score above zero,
    /// multiclass models the highest-scoring row
    fn predict_one(&self, text: &str) -> i64 {
        let scores = self.decision_function(&self.transform(text));
        if scores.len() == 1 {
            self.classes[usize::from(scores[0] > 0.0)]
        } else {
            self.classes[argmax(&scores)]
        }
    }

    fn proba_one(&self, text: &str) -> Vec<f64> {
        let scores = self.decision_function(&self.transform(text));
        if scores.len() == 1 {
            let p1 = sigmoid(scores[0]);
            vec![1.0 - p1, p1]
        } else {
            softmax(&scores)
        }
    }
}

impl ReviewClassifier for LinearTextModel {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifierError> {
        Ok(texts
            .iter()
            .map(|t| self.predict_one(t))
            .collect())
    }

    fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ClassifierError> {
        Ok(texts.iter().map(|t| self.proba_one(t)).collect())
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
