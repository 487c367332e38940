//! NewsCheck Classifiers
//!
//! Inference core of the fake-news classifier.
//!
//! Two independently trained model stacks are loaded lazily through a
//! [`ModelCache`]:
//! - Embedding stack: sentence encoder (Candle) + logistic regression,
//!   used by the [`PrimaryClassifier`] for the Fake/Real label
//! - Lexical stack: TF-IDF vectorizer + Naive Bayes, used by the
//!   [`Explainer`] to rank contributing terms
//!
//! The [`PatternDetector`] adds a model-free topical tag.

pub mod artifacts;
pub mod cache;
pub mod classifier;
pub mod embedding;
pub mod explainer;
pub mod logistic;
pub mod naive_bayes;
pub mod patterns;
pub mod primary;
pub mod tfidf;

pub use artifacts::{ArtifactFiles, ArtifactLoader, ArtifactStore};
pub use cache::{EmbeddingStack, LexicalStack, ModelCache, PreloadReport, StackLoader};
pub use classifier::{ProbabilisticClassifier, SparseVector, TermLogProbClassifier, TermVectorizer, TextEmbedder};
pub use embedding::{DeviceType, EncoderSpec, PoolingMode};
pub use explainer::Explainer;
pub use logistic::{LogisticRegression, MultiClass};
pub use naive_bayes::{NaiveBayes, NaiveBayesKind};
pub use patterns::{PatternCategory, PatternDetector, PatternTaxonomy};
pub use primary::PrimaryClassifier;
pub use tfidf::TfidfVectorizer;

#[cfg(feature = "ml-models")]
pub use embedding::SentenceEncoder;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{ModelCache, StackLoader};
    pub use crate::classifier::{ProbabilisticClassifier, TermLogProbClassifier, TermVectorizer, TextEmbedder};
    pub use crate::explainer::Explainer;
    pub use crate::patterns::PatternDetector;
    pub use crate::primary::PrimaryClassifier;
}
