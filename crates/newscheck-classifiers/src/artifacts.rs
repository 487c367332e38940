//! Artifact store layout and the default [`StackLoader`]
//!
//! The offline training jobs export three files into one directory:
//! - `sbert_logreg.json`: logistic regression over sentence embeddings
//! - `sbert_config.json`: `{"encoder_name": ...}` naming the encoder
//! - `model.json`: TF-IDF vectorizer + Naive Bayes pipeline

use crate::cache::{EmbeddingStack, LexicalStack, StackLoader};
use crate::embedding::{DeviceType, EncoderSpec};
use crate::logistic::LogisticRegression;
use crate::naive_bayes::NaiveBayes;
use crate::tfidf::{TfidfExport, TfidfVectorizer};
use newscheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names inside the artifact directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFiles {
    #[serde(default = "default_embedding_classifier")]
    pub embedding_classifier: String,

    #[serde(default = "default_embedding_config")]
    pub embedding_config: String,

    #[serde(default = "default_lexical_pipeline")]
    pub lexical_pipeline: String,
}

fn default_embedding_classifier() -> String {
    "sbert_logreg.json".to_string()
}

fn default_embedding_config() -> String {
    "sbert_config.json".to_string()
}

fn default_lexical_pipeline() -> String {
    "model.json".to_string()
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            embedding_classifier: default_embedding_classifier(),
            embedding_config: default_embedding_config(),
            lexical_pipeline: default_lexical_pipeline(),
        }
    }
}

/// Two-stage pipeline export, mirroring `named_steps` of the fitted pipeline
#[derive(Debug, Deserialize)]
struct LexicalPipelineExport {
    tfidf: TfidfExport,
    clf: NaiveBayes,
}

/// Read-only view over an artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    files: ArtifactFiles,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_files(dir, ArtifactFiles::default())
    }

    pub fn with_files(dir: impl Into<PathBuf>, files: ArtifactFiles) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn embedding_classifier_path(&self) -> PathBuf {
        self.dir.join(&self.files.embedding_classifier)
    }

    pub fn embedding_config_path(&self) -> PathBuf {
        self.dir.join(&self.files.embedding_config)
    }

    pub fn lexical_pipeline_path(&self) -> PathBuf {
        self.dir.join(&self.files.lexical_pipeline)
    }

    fn read(path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| Error::artifact(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Logistic regression trained on embeddings
    pub fn load_embedding_classifier(&self) -> Result<LogisticRegression> {
        LogisticRegression::from_json(&Self::read(&self.embedding_classifier_path())?)
    }

    /// Encoder named by the embedding config record
    pub fn load_encoder_spec(&self) -> Result<EncoderSpec> {
        EncoderSpec::from_json(&Self::read(&self.embedding_config_path())?)
    }

    /// Vectorizer and classifier from the lexical pipeline export
    pub fn load_lexical_pipeline(&self) -> Result<(TfidfVectorizer, NaiveBayes)> {
        let path = self.lexical_pipeline_path();
        let export: LexicalPipelineExport = serde_json::from_str(&Self::read(&path)?)
            .map_err(|e| Error::artifact(format!("Malformed pipeline {}: {}", path.display(), e)))?;

        export.clf.validate()?;
        let vectorizer = TfidfVectorizer::from_export(export.tfidf)?;

        if vectorizer.len() != export.clf.n_features() {
            return Err(Error::artifact(format!(
                "Pipeline mismatch: vectorizer has {} terms, classifier expects {}",
                vectorizer.len(),
                export.clf.n_features()
            )));
        }

        Ok((vectorizer, export.clf))
    }
}

/// Loads both stacks from an [`ArtifactStore`]
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    store: ArtifactStore,
    device: DeviceType,
}

impl ArtifactLoader {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            device: DeviceType::Cpu,
        }
    }

    /// Set the device the encoder runs on
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

impl StackLoader for ArtifactLoader {
    fn load_embedding(&self) -> Result<EmbeddingStack> {
        // Classifier first: it is local and cheap to validate
        let classifier = self.store.load_embedding_classifier()?;
        let spec = self.store.load_encoder_spec()?;

        #[cfg(feature = "ml-models")]
        {
            use crate::classifier::TextEmbedder;

            let encoder = crate::embedding::SentenceEncoder::load(&spec, self.device)?;
            if encoder.dimension() != classifier.n_features() {
                return Err(Error::artifact(format!(
                    "Encoder '{}' produces {} dims but classifier expects {}",
                    spec.encoder_name,
                    encoder.dimension(),
                    classifier.n_features()
                )));
            }
            Ok(EmbeddingStack::new(Box::new(encoder), Box::new(classifier)))
        }

        #[cfg(not(feature = "ml-models"))]
        {
            let _ = (classifier, self.device);
            Err(Error::artifact(format!(
                "Encoder '{}' requires the 'ml-models' feature",
                spec.encoder_name
            )))
        }
    }

    fn load_lexical(&self) -> Result<LexicalStack> {
        let (vectorizer, classifier) = self.store.load_lexical_pipeline()?;
        Ok(LexicalStack::new(Box::new(vectorizer), Box::new(classifier)))
    }
}
