//! Primary classifier: sentence embedding + probabilistic classifier
//!
//! Produces the user-facing label, its probability, the advisory abstain
//! flag and the topical pattern tag.

use crate::cache::ModelCache;
use crate::classifier::argmax;
use crate::patterns::PatternDetector;
use newscheck_core::{Error, PredictionResult, Result, DEFAULT_ABSTAIN_THRESHOLD};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Embedding-based Fake/Real classifier
#[derive(Clone)]
pub struct PrimaryClassifier {
    cache: Arc<ModelCache>,
    detector: Arc<PatternDetector>,
}

impl PrimaryClassifier {
    pub fn new(cache: Arc<ModelCache>, detector: Arc<PatternDetector>) -> Self {
        Self { cache, detector }
    }

    /// Classify `text`; `abstain` is set when the rounded score is strictly
    /// below `abstain_threshold`. The label is returned either way.
    pub fn predict(&self, text: &str, abstain_threshold: f64) -> Result<PredictionResult> {
        let start = Instant::now();
        let stack = self.cache.embedding_stack()?;

        let embedding = stack.embedder.embed(text)?;
        let features: Vec<f64> = embedding.iter().map(|&v| f64::from(v)).collect();

        let proba = stack.classifier.predict_proba(&features)?;
        let labels = stack.labels();
        if proba.len() != labels.len() {
            return Err(Error::inference(format!(
                "Classifier returned {} probabilities for {} labels",
                proba.len(),
                labels.len()
            )));
        }

        let idx = argmax(&proba).ok_or_else(|| Error::inference("Empty probability distribution"))?;
        let label = labels[idx].clone();
        let score = round_score(proba[idx]);
        let abstain = score < abstain_threshold;
        let pattern = self.detector.detect(text);

        debug!(
            label = %label,
            score,
            abstain,
            pattern = ?pattern,
            latency_us = start.elapsed().as_micros() as u64,
            "Primary prediction"
        );

        Ok(PredictionResult {
            label,
            score,
            abstain,
            pattern,
        })
    }

    /// [`predict`](Self::predict) with the default 0.55 threshold
    pub fn predict_default(&self, text: &str) -> Result<PredictionResult> {
        self.predict(text, DEFAULT_ABSTAIN_THRESHOLD)
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }
}

/// Round a probability to 4 decimal places
pub fn round_score(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}
