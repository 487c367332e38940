//! TF-IDF term vectorizer
//!
//! Pure Rust inference for a fitted scikit-learn `TfidfVectorizer` with
//! word analyzer, exported to JSON. Tokenization follows the default
//! `(?u)\b\w\w+\b` token pattern.

use crate::classifier::{SparseVector, TermVectorizer};
use newscheck_core::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Row normalisation applied after weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// Exported vectorizer state (deserialized from JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfExport {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: [usize; 2],
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

fn default_ngram_range() -> [usize; 2] {
    [1, 1]
}

fn default_true() -> bool {
    true
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Fitted vectorizer ready for inference
pub struct TfidfVectorizer {
    index: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
    ngram_range: [usize; 2],
    lowercase: bool,
    sublinear_tf: bool,
    binary: bool,
    norm: Option<Norm>,
    token_re: Regex,
}

impl std::fmt::Debug for TfidfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfidfVectorizer")
            .field("vocabulary_size", &self.terms.len())
            .field("ngram_range", &self.ngram_range)
            .field("sublinear_tf", &self.sublinear_tf)
            .field("norm", &self.norm)
            .finish()
    }
}

impl TfidfVectorizer {
    /// Validate an export and build the vectorizer
    pub fn from_export(export: TfidfExport) -> Result<Self> {
        let TfidfExport {
            vocabulary,
            idf,
            ngram_range,
            lowercase,
            sublinear_tf,
            binary,
            norm,
        } = export;

        if vocabulary.len() != idf.len() {
            return Err(Error::artifact(format!(
                "TF-IDF vocabulary has {} terms but idf has {} entries",
                vocabulary.len(),
                idf.len()
            )));
        }
        if ngram_range[0] == 0 || ngram_range[0] > ngram_range[1] {
            return Err(Error::artifact(format!("Invalid ngram_range {:?}", ngram_range)));
        }

        let mut terms: Vec<Option<String>> = vec![None; idf.len()];
        for (term, &idx) in &vocabulary {
            match terms.get_mut(idx) {
                Some(slot @ None) => *slot = Some(term.clone()),
                Some(Some(other)) => {
                    return Err(Error::artifact(format!(
                        "TF-IDF terms '{}' and '{}' share index {}",
                        other, term, idx
                    )))
                }
                None => {
                    return Err(Error::artifact(format!(
                        "TF-IDF term '{}' has out-of-range index {}",
                        term, idx
                    )))
                }
            }
        }
        // Every slot is filled: sizes match and indices are unique
        let terms: Vec<String> = terms.into_iter().flatten().collect();

        let token_re = Regex::new(TOKEN_PATTERN)
            .map_err(|e| Error::internal(format!("Invalid token pattern: {}", e)))?;

        Ok(Self {
            index: vocabulary,
            terms,
            idf,
            ngram_range,
            lowercase,
            sublinear_tf,
            binary,
            norm,
            token_re,
        })
    }

    /// Parse and validate a JSON export
    pub fn from_json(raw: &str) -> Result<Self> {
        let export: TfidfExport = serde_json::from_str(raw)
            .map_err(|e| Error::artifact(format!("Malformed TF-IDF export: {}", e)))?;
        Self::from_export(export)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Split text into word tokens of at least two characters
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.token_re.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Count in-vocabulary word n-grams
    fn term_counts(&self, text: &str) -> HashMap<usize, u32> {
        let prepared;
        let text = if self.lowercase {
            prepared = text.to_lowercase();
            prepared.as_str()
        } else {
            text
        };

        let tokens = self.tokenize(text);
        let mut counts = HashMap::new();

        for n in self.ngram_range[0]..=self.ngram_range[1] {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&idx) = self.index.get(&gram) {
                    *counts.entry(idx).or_insert(0) += 1;
                }
            }
        }

        counts
    }
}

impl TermVectorizer for TfidfVectorizer {
    fn transform(&self, text: &str) -> SparseVector {
        let mut weights: SparseVector = self
            .term_counts(text)
            .into_iter()
            .map(|(idx, count)| {
                let tf = if self.binary {
                    1.0
                } else if self.sublinear_tf {
                    (count as f64).ln() + 1.0
                } else {
                    count as f64
                };
                (idx, tf * self.idf[idx])
            })
            .filter(|&(_, w)| w != 0.0)
            .collect();

        let norm = match self.norm {
            Some(Norm::L2) => weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt(),
            Some(Norm::L1) => weights.iter().map(|(_, w)| w.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, w) in weights.iter_mut() {
                *w /= norm;
            }
        }

        weights.sort_unstable_by_key(|&(idx, _)| idx);
        weights
    }

    fn vocabulary(&self) -> &[String] {
        &self.terms
    }
}
