//! Inference integration tests
//!
//! Exercises the primary classifier, explainer and model cache through
//! injected stack loaders, without downloading an encoder.

use newscheck_classifiers::embedding::l2_normalize;
use newscheck_classifiers::{
    EmbeddingStack, Explainer, LexicalStack, LogisticRegression, ModelCache, MultiClass, NaiveBayes,
    NaiveBayesKind, PatternDetector, PrimaryClassifier, ProbabilisticClassifier, StackLoader,
    TextEmbedder, TfidfVectorizer,
};
use newscheck_core::{Error, Result};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const DIM: usize = 16;

/// Deterministic bag-of-words embedder hashing tokens into buckets
struct HashingEmbedder;

impl TextEmbedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIM];
        for token in text.to_lowercase().split_whitespace() {
            let mut h: u32 = 2_166_136_261;
            for b in token.bytes() {
                h = (h ^ u32::from(b)).wrapping_mul(16_777_619);
            }
            v[h as usize % DIM] += 1.0;
        }
        v[0] += 0.01;
        l2_normalize(&mut v);
        Ok(v)
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "hashing-embedder"
    }
}

/// Classifier returning the same distribution for every input
struct FixedClassifier {
    labels: Vec<String>,
    proba: Vec<f64>,
}

impl FixedClassifier {
    fn new(labels: &[&str], proba: &[f64]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            proba: proba.to_vec(),
        }
    }
}

impl ProbabilisticClassifier for FixedClassifier {
    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
        Ok(self.proba.clone())
    }

    fn class_labels(&self) -> &[String] {
        &self.labels
    }
}

/// Embedder that always fails, standing in for a broken encoder runtime
struct BrokenEmbedder;

impl TextEmbedder for BrokenEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::inference("encoder runtime failure"))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "broken"
    }
}

type EmbeddingFactory = Box<dyn Fn() -> Result<EmbeddingStack> + Send + Sync>;

/// Loader counting how often each stack is built
struct CountingLoader {
    embedding: EmbeddingFactory,
    embedding_loads: AtomicUsize,
    lexical_loads: AtomicUsize,
    load_delay: Duration,
}

impl CountingLoader {
    fn new(embedding: EmbeddingFactory) -> Self {
        Self {
            embedding,
            embedding_loads: AtomicUsize::new(0),
            lexical_loads: AtomicUsize::new(0),
            load_delay: Duration::ZERO,
        }
    }

    fn fixed(labels: &'static [&'static str], proba: &'static [f64]) -> Self {
        Self::new(Box::new(move || -> Result<EmbeddingStack> {
            Ok(EmbeddingStack::new(
                Box::new(HashingEmbedder),
                Box::new(FixedClassifier::new(labels, proba)),
            ))
        }))
    }

    fn logistic() -> Self {
        Self::new(Box::new(|| -> Result<EmbeddingStack> {
            let coef: Vec<f64> = (0..DIM).map(|i| (i as f64 - 7.5) / 4.0).collect();
            let classifier = LogisticRegression::new(
                vec!["Fake".into(), "Real".into()],
                vec![coef],
                vec![0.05],
                MultiClass::Multinomial,
            )?;
            Ok(EmbeddingStack::new(Box::new(HashingEmbedder), Box::new(classifier)))
        }))
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }
}

impl StackLoader for CountingLoader {
    fn load_embedding(&self) -> Result<EmbeddingStack> {
        self.embedding_loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.load_delay);
        (self.embedding)()
    }

    fn load_lexical(&self) -> Result<LexicalStack> {
        self.lexical_loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.load_delay);

        let vectorizer = TfidfVectorizer::from_json(
            r#"{
                "vocabulary": {
                    "vacuna": 0, "mortales": 1, "evidencia": 2, "científica": 3,
                    "municipalidad": 4, "huancayo": 5, "presupuesto": 6, "obras": 7,
                    "locales": 8, "aprueba": 9, "vacuna causa": 10
                },
                "idf": [1.4, 1.9, 1.6, 1.7, 1.3, 1.1, 1.5, 1.2, 1.6, 1.8, 2.1],
                "ngram_range": [1, 2]
            }"#,
        )?;
        let classifier = NaiveBayes::new(
            NaiveBayesKind::Complement,
            vec!["Fake".into(), "Real".into()],
            vec![
                vec![2.4, 2.6, 2.2, 2.3, 1.1, 1.0, 1.2, 1.1, 1.0, 1.2, 2.8],
                vec![1.0, 0.9, 1.1, 1.0, 2.5, 2.7, 2.4, 2.3, 2.2, 2.1, 0.8],
            ],
            vec![],
        )?;
        Ok(LexicalStack::new(Box::new(vectorizer), Box::new(classifier)))
    }
}

fn components(loader: Arc<CountingLoader>) -> (PrimaryClassifier, Explainer) {
    let cache = Arc::new(ModelCache::new(loader));
    let detector = Arc::new(PatternDetector::news().unwrap());
    (PrimaryClassifier::new(cache.clone(), detector), Explainer::new(cache))
}

const HUANCAYO: &str = "Municipalidad de Huancayo aprueba presupuesto para obras locales";

#[test]
fn test_huancayo_scenario() {
    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real"], &[0.2, 0.8]));
    let (primary, _) = components(loader);

    let result = primary.predict(HUANCAYO, 0.55).unwrap();
    assert_eq!(result.label, "Real");
    assert_eq!(result.score, 0.8);
    assert!(!result.abstain);
    assert_eq!(result.pattern.as_deref(), Some("política"));
}

#[test]
fn test_abstain_boundary_is_strict() {
    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real"], &[0.45, 0.55]));
    let (primary, _) = components(loader);
    let result = primary.predict(HUANCAYO, 0.55).unwrap();
    assert_eq!(result.score, 0.55);
    assert!(!result.abstain);

    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real"], &[0.4501, 0.5499]));
    let (primary, _) = components(loader);
    let result = primary.predict(HUANCAYO, 0.55).unwrap();
    assert_eq!(result.score, 0.5499);
    assert!(result.abstain);
    // abstaining still reports the best guess
    assert_eq!(result.label, "Real");
}

#[test]
fn test_score_rounded_to_four_places() {
    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real"], &[0.876543219, 0.123456781]));
    let (primary, _) = components(loader);
    let result = primary.predict(HUANCAYO, 0.55).unwrap();
    assert_eq!(result.label, "Fake");
    assert_eq!(result.score, 0.8765);
}

#[test]
fn test_label_set_comes_from_the_classifier() {
    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real", "Sátira"], &[0.1, 0.3, 0.6]));
    let (primary, _) = components(loader);
    let result = primary.predict("Texto de prueba suficientemente largo", 0.55).unwrap();
    assert_eq!(result.label, "Sátira");
    assert_eq!(result.score, 0.6);
}

#[test]
fn test_distribution_length_mismatch_is_inference_error() {
    let loader = Arc::new(CountingLoader::fixed(&["Fake", "Real"], &[0.2, 0.3, 0.5]));
    let (primary, _) = components(loader);
    let err = primary.predict(HUANCAYO, 0.55).unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[test]
fn test_encoder_failure_propagates_without_fallback() {
    let loader = Arc::new(CountingLoader::new(Box::new(|| -> Result<EmbeddingStack> {
        Ok(EmbeddingStack::new(
            Box::new(BrokenEmbedder),
            Box::new(FixedClassifier::new(&["Fake", "Real"], &[0.5, 0.5])),
        ))
    })));
    let (primary, explainer) = components(loader);

    assert!(matches!(primary.predict(HUANCAYO, 0.55).unwrap_err(), Error::Inference(_)));
    // the lexical stack is unaffected
    assert!(explainer.explain(HUANCAYO, 8).is_ok());
}

#[test]
fn test_embedding_load_failure_does_not_block_explainer() {
    let loader = Arc::new(CountingLoader::new(Box::new(|| -> Result<EmbeddingStack> {
        Err(Error::artifact("sbert_logreg.json not found"))
    })));
    let (primary, explainer) = components(loader.clone());

    assert!(matches!(primary.predict(HUANCAYO, 0.55).unwrap_err(), Error::ArtifactLoad(_)));
    assert!(matches!(primary.predict(HUANCAYO, 0.55).unwrap_err(), Error::ArtifactLoad(_)));
    // each failed call is its own load attempt
    assert_eq!(loader.embedding_loads.load(Ordering::SeqCst), 2);

    let explanation = explainer.explain(HUANCAYO, 8).unwrap();
    assert_eq!(explanation.predicted_by_tfidf, "Real");
}

#[test]
fn test_prediction_is_idempotent() {
    let loader = Arc::new(CountingLoader::logistic());
    let (primary, _) = components(loader.clone());

    let text = "Vacuna causa efectos mortales sin evidencia científica";
    let first = primary.predict(text, 0.55).unwrap();
    let second = primary.predict(text, 0.55).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.score.to_bits(), second.score.to_bits());
    assert_eq!(loader.embedding_loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explanation_for_fake_text() {
    let loader = Arc::new(CountingLoader::logistic());
    let (_, explainer) = components(loader);

    let result = explainer
        .explain("Vacuna causa efectos mortales sin evidencia científica", 3)
        .unwrap();

    assert_eq!(result.explainer_model, "tfidf+ComplementNB");
    assert_eq!(result.predicted_by_tfidf, "Fake");
    assert_eq!(result.top_terms.len(), 3);
    assert!(result
        .top_terms
        .windows(2)
        .all(|pair| pair[0].contrib >= pair[1].contrib));
}

#[test]
fn test_explanation_with_unknown_vocabulary() {
    let loader = Arc::new(CountingLoader::logistic());
    let (_, explainer) = components(loader);

    let result = explainer.explain("Lorem ipsum dolor sit amet consectetur", 8).unwrap();
    assert!(result.top_terms.is_empty());
}

#[test]
fn test_concurrent_first_use_loads_once() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    const CALLERS: usize = 16;
    let loader = Arc::new(CountingLoader::logistic().with_delay(Duration::from_millis(50)));
    let (primary, explainer) = components(loader.clone());
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let primary = primary.clone();
            let explainer = explainer.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    primary.predict(HUANCAYO, 0.55).map(|r| r.label)
                } else {
                    explainer.explain(HUANCAYO, 8).map(|r| r.predicted_by_tfidf)
                }
            })
        })
        .collect();

    for handle in handles {
        let label = handle.join().unwrap().unwrap();
        assert!(label == "Fake" || label == "Real");
    }

    assert_eq!(loader.embedding_loads.load(Ordering::SeqCst), 1);
    assert_eq!(loader.lexical_loads.load(Ordering::SeqCst), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_score_and_abstain_invariants(text in "\\PC{0,200}", threshold in 0.0f64..1.0) {
        let loader = Arc::new(CountingLoader::logistic());
        let (primary, _) = components(loader);

        let result = primary.predict(&text, threshold).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.score));
        let scaled = result.score * 10_000.0;
        prop_assert!((scaled - scaled.round()).abs() < 1e-6);
        prop_assert_eq!(result.abstain, result.score < threshold);
    }

    #[test]
    fn prop_explanation_sorted_and_bounded(
        words in proptest::collection::vec(
            prop::sample::select(vec![
                "vacuna", "mortales", "evidencia", "científica", "municipalidad",
                "huancayo", "presupuesto", "obras", "locales", "aprueba", "causa", "de",
            ]),
            0..40,
        ),
        top_k in 0usize..12,
    ) {
        let loader = Arc::new(CountingLoader::logistic());
        let (_, explainer) = components(loader);

        let result = explainer.explain(&words.join(" "), top_k).unwrap();
        prop_assert!(result.top_terms.len() <= top_k);
        for pair in result.top_terms.windows(2) {
            prop_assert!(pair[0].contrib >= pair[1].contrib);
        }
    }
}
