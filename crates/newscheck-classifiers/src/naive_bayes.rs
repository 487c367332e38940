//! Naive Bayes over TF-IDF features
//!
//! Inference for scikit-learn `ComplementNB` and `MultinomialNB` exports.
//! Both score a document as `X · feature_log_prob[c]`; the multinomial
//! variant adds the class log prior, the complement variant only does so
//! for single-class models.

use crate::classifier::{argmax, SparseVector, TermLogProbClassifier};
use newscheck_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Naive Bayes flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NaiveBayesKind {
    #[default]
    Complement,
    Multinomial,
}

impl NaiveBayesKind {
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Complement => "ComplementNB",
            Self::Multinomial => "MultinomialNB",
        }
    }
}

/// Exported Naive Bayes parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    #[serde(default)]
    kind: NaiveBayesKind,
    classes: Vec<String>,
    /// `[class][term]` log-probabilities
    feature_log_prob: Vec<Vec<f64>>,
    #[serde(default)]
    class_log_prior: Vec<f64>,
}

impl NaiveBayes {
    pub fn new(
        kind: NaiveBayesKind,
        classes: Vec<String>,
        feature_log_prob: Vec<Vec<f64>>,
        class_log_prior: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            kind,
            classes,
            feature_log_prob,
            class_log_prior,
        };
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate a JSON export
    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw)
            .map_err(|e| Error::artifact(format!("Malformed Naive Bayes export: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn kind(&self) -> NaiveBayesKind {
        self.kind
    }

    /// Number of terms each class row covers
    pub fn n_features(&self) -> usize {
        self.feature_log_prob.first().map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(Error::artifact("Naive Bayes export has no classes"));
        }
        if self.feature_log_prob.len() != self.classes.len() {
            return Err(Error::artifact(format!(
                "Naive Bayes has {} classes but {} feature_log_prob rows",
                self.classes.len(),
                self.feature_log_prob.len()
            )));
        }
        let width = self.n_features();
        if self.feature_log_prob.iter().any(|row| row.len() != width) {
            return Err(Error::artifact("Naive Bayes feature_log_prob rows have inconsistent width"));
        }
        if self.needs_prior() && self.class_log_prior.len() != self.classes.len() {
            return Err(Error::artifact(format!(
                "Naive Bayes needs {} class_log_prior entries, found {}",
                self.classes.len(),
                self.class_log_prior.len()
            )));
        }
        Ok(())
    }

    fn needs_prior(&self) -> bool {
        match self.kind {
            NaiveBayesKind::Multinomial => true,
            NaiveBayesKind::Complement => self.classes.len() == 1,
        }
    }

    /// Unnormalised joint log-likelihood per class
    pub fn joint_log_likelihood(&self, features: &SparseVector) -> Result<Vec<f64>> {
        let width = self.n_features();
        let mut scores = Vec::with_capacity(self.classes.len());

        for (class_idx, row) in self.feature_log_prob.iter().enumerate() {
            let mut score = 0.0;
            for &(term, weight) in features {
                let log_prob = row.get(term).ok_or_else(|| {
                    Error::inference(format!("Term index {} outside {} features", term, width))
                })?;
                score += weight * log_prob;
            }
            if self.needs_prior() {
                score += self.class_log_prior[class_idx];
            }
            scores.push(score);
        }

        Ok(scores)
    }
}

impl TermLogProbClassifier for NaiveBayes {
    fn predict(&self, features: &SparseVector) -> Result<String> {
        let scores = self.joint_log_likelihood(features)?;
        let idx = argmax(&scores).ok_or_else(|| Error::inference("Naive Bayes has no classes"))?;
        Ok(self.classes[idx].clone())
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }

    fn feature_log_prob(&self, class_idx: usize) -> Option<&[f64]> {
        self.feature_log_prob.get(class_idx).map(Vec::as_slice)
    }

    fn model_name(&self) -> &str {
        self.kind.model_name()
    }
}
