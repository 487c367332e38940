//! Result types shared between the classifiers and the service layer

use serde::{Deserialize, Serialize};

/// Default confidence below which a prediction is flagged as abstaining
pub const DEFAULT_ABSTAIN_THRESHOLD: f64 = 0.55;

/// Default number of terms returned by the explainer
pub const DEFAULT_TOP_K: usize = 8;

/// Output of the primary (embedding-based) classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Winning class label, as named by the loaded classifier
    pub label: String,

    /// Probability of `label`, rounded to 4 decimal places
    pub score: f64,

    /// Advisory flag: `score` fell strictly below the abstain threshold
    pub abstain: bool,

    /// Topical category from the keyword detector, if any keyword matched
    pub pattern: Option<String>,
}

/// A single term and its signed contribution to the lexical prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermContribution {
    pub term: String,
    pub contrib: f64,
}

/// Output of the lexical explainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    /// Identifier of the model stack that produced the explanation
    pub explainer_model: String,

    /// Label predicted by the TF-IDF + Naive-Bayes pipeline
    pub predicted_by_tfidf: String,

    /// Terms ordered by descending contribution
    pub top_terms: Vec<TermContribution>,
}

impl ExplanationResult {
    /// Check whether any vocabulary term was found in the text
    pub fn is_empty(&self) -> bool {
        self.top_terms.is_empty()
    }
}

/// Where the classified text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Text,
    Url,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
        }
    }
}
