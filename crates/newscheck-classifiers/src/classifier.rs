//! Capability traits for the two model stacks
//!
//! The concrete models (candle sentence encoder, logistic regression,
//! TF-IDF vectorizer, Naive Bayes) are swappable behind these traits.
//! Every class-indexed lookup goes through `class_labels()`, which is
//! whatever the loaded artifact was trained on.

use newscheck_core::Result;

/// Sparse document vector: `(term index, weight)` pairs with nonzero weight,
/// sorted by term index.
pub type SparseVector = Vec<(usize, f64)>;

/// Text encoder producing a fixed-length, unit-norm embedding
pub trait TextEmbedder: Send + Sync {
    /// Embed a single document
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of the vectors returned by `embed`
    fn dimension(&self) -> usize;

    /// Identifier of the underlying encoder
    fn name(&self) -> &str;
}

/// Multi-class probabilistic classifier over dense vectors
pub trait ProbabilisticClassifier: Send + Sync {
    /// Probability for every class, in `class_labels()` order
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Ordered class labels
    fn class_labels(&self) -> &[String];

    /// Label of the most probable class (first maximum wins)
    fn predict(&self, features: &[f64]) -> Result<String> {
        let proba = self.predict_proba(features)?;
        let idx = argmax(&proba).ok_or_else(|| {
            newscheck_core::Error::inference("classifier returned an empty distribution")
        })?;
        self.class_labels()
            .get(idx)
            .cloned()
            .ok_or_else(|| newscheck_core::Error::inference(format!("class index {} out of range", idx)))
    }
}

/// Fitted term vectorizer over a fixed vocabulary
pub trait TermVectorizer: Send + Sync {
    /// Weighted sparse representation of a document
    fn transform(&self, text: &str) -> SparseVector;

    /// Vocabulary ordered by term index
    fn vocabulary(&self) -> &[String];
}

/// Naive-Bayes style classifier exposing per-class per-term log-probabilities
pub trait TermLogProbClassifier: Send + Sync {
    /// Predicted label for an already vectorized document
    fn predict(&self, features: &SparseVector) -> Result<String>;

    /// Ordered class labels
    fn class_labels(&self) -> &[String];

    /// Per-term log-probabilities for the class at `class_idx`
    fn feature_log_prob(&self, class_idx: usize) -> Option<&[f64]>;

    /// Short model name, e.g. `ComplementNB`
    fn model_name(&self) -> &str;

    /// Index of `label` within `class_labels()`
    fn class_index(&self, label: &str) -> Option<usize> {
        self.class_labels().iter().position(|l| l == label)
    }
}

/// Index of the first maximum, `None` for an empty slice
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_maximum_wins() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[0.9, 0.1]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_negative_values() {
        assert_eq!(argmax(&[-3.0, -1.5, -2.0]), Some(1));
    }
}
