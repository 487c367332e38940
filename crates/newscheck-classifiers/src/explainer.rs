//! Term-level explanations from the lexical stack
//!
//! The TF-IDF + Naive-Bayes pipeline is trained independently of the
//! primary classifier, so its label may disagree with it. Terms are scored
//! as `tfidf weight × log-probability` under the pipeline's own predicted
//! class and ranked by the signed score, largest first. Equal scores go
//! to the higher vocabulary index first.

use crate::cache::ModelCache;
use newscheck_core::{Error, ExplanationResult, Result, TermContribution, DEFAULT_TOP_K};
use std::sync::Arc;
use tracing::debug;

/// Explains lexical predictions term by term
#[derive(Clone)]
pub struct Explainer {
    cache: Arc<ModelCache>,
}

impl Explainer {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    /// Top `top_k` contributing terms for the pipeline's predicted class
    pub fn explain(&self, text: &str, top_k: usize) -> Result<ExplanationResult> {
        let stack = self.cache.lexical_stack()?;

        let features = stack.vectorizer.transform(text);
        let predicted = stack.classifier.predict(&features)?;

        let class_idx = stack
            .classifier
            .class_index(&predicted)
            .ok_or_else(|| Error::inference(format!("Predicted label '{}' is not a known class", predicted)))?;
        let log_probs = stack
            .classifier
            .feature_log_prob(class_idx)
            .ok_or_else(|| Error::inference(format!("No log-probabilities for class '{}'", predicted)))?;
        let vocabulary = stack.vectorizer.vocabulary();

        let mut ranked = features
            .iter()
            .map(|&(idx, weight)| {
                let term = vocabulary
                    .get(idx)
                    .ok_or_else(|| Error::inference(format!("Term index {} outside vocabulary", idx)))?;
                let log_prob = log_probs
                    .get(idx)
                    .ok_or_else(|| Error::inference(format!("Term index {} outside log-probabilities", idx)))?;
                Ok((
                    idx,
                    TermContribution {
                        term: term.clone(),
                        contrib: weight * log_prob,
                    },
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        // Signed ranking: strongly negative terms sink to the bottom
        ranked.sort_by(|(a_idx, a), (b_idx, b)| {
            b.contrib.total_cmp(&a.contrib).then(b_idx.cmp(a_idx))
        });
        let top_terms: Vec<TermContribution> =
            ranked.into_iter().take(top_k).map(|(_, term)| term).collect();

        debug!(
            predicted = %predicted,
            terms_in_text = features.len(),
            returned = top_terms.len(),
            "Lexical explanation"
        );

        Ok(ExplanationResult {
            explainer_model: stack.identifier(),
            predicted_by_tfidf: predicted,
            top_terms,
        })
    }

    /// [`explain`](Self::explain) with the default of 8 terms
    pub fn explain_default(&self, text: &str) -> Result<ExplanationResult> {
        self.explain(text, DEFAULT_TOP_K)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EmbeddingStack, LexicalStack, StackLoader};
    use crate::naive_bayes::{NaiveBayes, NaiveBayesKind};
    use crate::tfidf::TfidfVectorizer;

    struct Lexical(NaiveBayesKind, Vec<Vec<f64>>);

    impl StackLoader for Lexical {
        fn load_embedding(&self) -> Result<EmbeddingStack> {
            Err(Error::artifact("not used"))
        }

        fn load_lexical(&self) -> Result<LexicalStack> {
            let vectorizer = TfidfVectorizer::from_json(
                r#"{
                    "vocabulary": {"vacuna": 0, "mortales": 1, "evidencia": 2, "huancayo": 3},
                    "idf": [1.0, 1.0, 1.0, 1.0],
                    "norm": null
                }"#,
            )?;
            let prior = vec![(0.5f64).ln(); 2];
            let classifier = NaiveBayes::new(self.0, vec!["Fake".into(), "Real".into()], self.1.clone(), prior)?;
            Ok(LexicalStack::new(Box::new(vectorizer), Box::new(classifier)))
        }
    }

    fn explainer(kind: NaiveBayesKind, flp: Vec<Vec<f64>>) -> Explainer {
        Explainer::new(Arc::new(ModelCache::new(Arc::new(Lexical(kind, flp)))))
    }

    #[test]
    fn test_ranks_by_signed_contribution() {
        let explainer = explainer(
            NaiveBayesKind::Complement,
            vec![vec![3.0, 2.0, 1.0, 0.1], vec![0.1, 0.2, 0.3, 3.0]],
        );

        let result = explainer
            .explain("Vacuna con efectos mortales sin evidencia", 8)
            .unwrap();
        assert_eq!(result.predicted_by_tfidf, "Fake");
        assert_eq!(result.explainer_model, "tfidf+ComplementNB");

        let terms: Vec<&str> = result.top_terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["vacuna", "mortales", "evidencia"]);
        assert_eq!(result.top_terms[0].contrib, 3.0);
    }

    #[test]
    fn test_negative_log_probs_keep_signed_order() {
        // multinomial log-probabilities are negative
        let explainer = explainer(
            NaiveBayesKind::Multinomial,
            vec![vec![-0.5, -3.0, -1.0, -4.0], vec![-2.0, -2.0, -2.0, -0.2]],
        );

        let result = explainer.explain("vacuna mortales evidencia", 2).unwrap();
        assert_eq!(result.predicted_by_tfidf, "Fake");
        assert_eq!(result.explainer_model, "tfidf+MultinomialNB");

        // -0.5 > -1.0 > -3.0; the most negative term is cut by top_k
        let terms: Vec<&str> = result.top_terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["vacuna", "evidencia"]);
        assert!(result.top_terms.iter().all(|t| t.contrib < 0.0));
    }

    #[test]
    fn test_ties_go_to_higher_vocabulary_index() {
        let explainer = explainer(
            NaiveBayesKind::Complement,
            vec![vec![2.0, 2.0, 0.5, 0.5], vec![0.1, 0.1, 0.1, 0.1]],
        );

        let result = explainer.explain("vacuna mortales", 1).unwrap();
        assert_eq!(result.predicted_by_tfidf, "Fake");
        assert_eq!(result.top_terms.len(), 1);
        assert_eq!(result.top_terms[0].term, "mortales");

        let result = explainer.explain("vacuna mortales evidencia huancayo", 8).unwrap();
        let terms: Vec<&str> = result.top_terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["mortales", "vacuna", "huancayo", "evidencia"]);
    }

    #[test]
    fn test_no_vocabulary_terms_is_empty_not_error() {
        let explainer = explainer(
            NaiveBayesKind::Complement,
            vec![vec![1.0, 1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0, 1.0]],
        );
        let result = explainer.explain_default("Nada relevante por aquí").unwrap();
        assert!(result.is_empty());
        assert_eq!(result.predicted_by_tfidf, "Fake");
    }

    #[test]
    fn test_top_k_zero() {
        let explainer = explainer(
            NaiveBayesKind::Complement,
            vec![vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0, 2.0]],
        );
        let result = explainer.explain("vacuna en Huancayo", 0).unwrap();
        assert!(result.top_terms.is_empty());
        assert_eq!(result.predicted_by_tfidf, "Real");
    }
}
