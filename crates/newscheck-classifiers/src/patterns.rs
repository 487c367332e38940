//! Keyword-based topical pattern detector
//!
//! Tags a text with the taxonomy category whose keywords appear most often.
//! Independent of the trained models and never touches the model cache.

use aho_corasick::{AhoCorasick, MatchKind};
use newscheck_core::Result;
use serde::{Deserialize, Serialize};

/// A named category and its trigger keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl PatternCategory {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered category list. Order matters: on equal hit counts the category
/// listed first wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTaxonomy {
    categories: Vec<PatternCategory>,
}

impl PatternTaxonomy {
    pub fn new(categories: Vec<PatternCategory>) -> Self {
        Self { categories }
    }

    /// Health, politics and economy keywords for regional Spanish-language news
    pub fn news() -> Self {
        Self::new(vec![
            PatternCategory::new(
                "salud",
                &[
                    "vacuna", "covid", "hospital", "salud", "síntoma", "médico", "casos",
                    "epidemia", "dengue",
                ],
            ),
            PatternCategory::new(
                "política",
                &[
                    "congreso", "alcalde", "gobierno", "elecciones", "decreto", "ministro",
                    "partido", "corrupción", "municipalidad",
                ],
            ),
            PatternCategory::new(
                "economía",
                &[
                    "inflación", "precio", "dólar", "pbi", "desempleo", "impuesto",
                    "importación", "minería", "comercio",
                ],
            ),
        ])
    }

    pub fn categories(&self) -> &[PatternCategory] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for PatternTaxonomy {
    fn default() -> Self {
        Self::news()
    }
}

/// Substring keyword counter over a [`PatternTaxonomy`]
pub struct PatternDetector {
    taxonomy: PatternTaxonomy,
    matcher: AhoCorasick,
    /// (category index, keyword index) for every automaton pattern
    owners: Vec<(usize, usize)>,
}

impl PatternDetector {
    /// Build a detector; keywords are lower-cased and empty ones dropped
    pub fn new(taxonomy: PatternTaxonomy) -> Result<Self> {
        let mut owners = Vec::new();
        let mut needles = Vec::new();

        for (cat_idx, category) in taxonomy.categories().iter().enumerate() {
            for (kw_idx, keyword) in category.keywords.iter().enumerate() {
                if keyword.is_empty() {
                    tracing::warn!("Ignoring empty keyword in pattern category '{}'", category.name);
                    continue;
                }
                owners.push((cat_idx, kw_idx));
                needles.push(keyword.to_lowercase());
            }
        }

        // Overlapping search needs the standard match semantics
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&needles)
            .map_err(|e| newscheck_core::Error::config(format!("Failed to build pattern matcher: {}", e)))?;

        Ok(Self {
            taxonomy,
            matcher,
            owners,
        })
    }

    /// Detector over the built-in news taxonomy
    pub fn news() -> Result<Self> {
        Self::new(PatternTaxonomy::news())
    }

    pub fn taxonomy(&self) -> &PatternTaxonomy {
        &self.taxonomy
    }

    /// Number of distinct keywords of each category present in `text`,
    /// in taxonomy order
    pub fn counts(&self, text: &str) -> Vec<(&str, usize)> {
        let lowered = text.to_lowercase();
        let categories = self.taxonomy.categories();

        let mut seen: Vec<Vec<bool>> = categories
            .iter()
            .map(|c| vec![false; c.keywords.len()])
            .collect();

        for m in self.matcher.find_overlapping_iter(&lowered) {
            let (cat_idx, kw_idx) = self.owners[m.pattern().as_usize()];
            seen[cat_idx][kw_idx] = true;
        }

        categories
            .iter()
            .zip(seen)
            .map(|(category, hits)| (category.name.as_str(), hits.into_iter().filter(|&h| h).count()))
            .collect()
    }

    /// Category with the strictly highest keyword count, `None` if nothing matched
    pub fn detect(&self, text: &str) -> Option<String> {
        let mut best: Option<&str> = None;
        let mut hits = 0;

        for (name, count) in self.counts(text) {
            if count > hits {
                best = Some(name);
                hits = count;
            }
        }

        best.map(str::to_string)
    }
}
