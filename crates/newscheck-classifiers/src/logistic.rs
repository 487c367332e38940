//! Logistic regression over sentence embeddings
//!
//! Inference-only port of a fitted scikit-learn `LogisticRegression`,
//! deserialized from its JSON export.

use crate::classifier::ProbabilisticClassifier;
use newscheck_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// How per-class scores become a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    /// Softmax over the class scores
    #[default]
    Multinomial,
    /// Independent sigmoids, normalised to sum to one
    Ovr,
}

/// Exported logistic regression weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    classes: Vec<String>,
    /// One row per class, or a single row for binary models
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    multi_class: MultiClass,
}

impl LogisticRegression {
    /// Build and validate a model
    pub fn new(
        classes: Vec<String>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
        multi_class: MultiClass,
    ) -> Result<Self> {
        let model = Self {
            classes,
            coef,
            intercept,
            multi_class,
        };
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate a JSON export
    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw)
            .map_err(|e| Error::artifact(format!("Malformed logistic regression export: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Number of input features
    pub fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coef.len() == 1
    }

    fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(Error::artifact(format!(
                "Logistic regression needs at least 2 classes, found {}",
                self.classes.len()
            )));
        }

        let expected_rows = if self.classes.len() == 2 && self.coef.len() == 1 {
            1
        } else {
            self.classes.len()
        };
        if self.coef.len() != expected_rows || self.intercept.len() != expected_rows {
            return Err(Error::artifact(format!(
                "Logistic regression shape mismatch: {} classes, {} coef rows, {} intercepts",
                self.classes.len(),
                self.coef.len(),
                self.intercept.len()
            )));
        }

        let width = self.n_features();
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err(Error::artifact("Logistic regression coef rows have inconsistent width"));
        }

        Ok(())
    }

    fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, bias)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect()
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(Error::inference(format!(
                "Expected {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }

        let scores = self.decision_function(features);

        if self.is_binary() {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }

        let proba = match self.multi_class {
            MultiClass::Multinomial => softmax(&scores),
            MultiClass::Ovr => {
                let raw: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                let total: f64 = raw.iter().sum();
                raw.into_iter().map(|p| p / total).collect()
            }
        };

        Ok(proba)
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
