//! Lazily-loaded model stacks
//!
//! [`ModelCache`] owns the two model stacks and guarantees each is loaded at
//! most once, even when many requests hit it cold at the same time. Readers
//! see either "not loaded" or a complete stack; after publication reads take
//! no lock. A failed load leaves the slot empty so a later call can retry.

use crate::classifier::{ProbabilisticClassifier, TermLogProbClassifier, TermVectorizer, TextEmbedder};
use newscheck_core::{Error, Result};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{info, warn};

/// Sentence encoder paired with the classifier trained on its embeddings
pub struct EmbeddingStack {
    pub embedder: Box<dyn TextEmbedder>,
    pub classifier: Box<dyn ProbabilisticClassifier>,
}

impl EmbeddingStack {
    pub fn new(embedder: Box<dyn TextEmbedder>, classifier: Box<dyn ProbabilisticClassifier>) -> Self {
        Self { embedder, classifier }
    }

    /// Class labels in distribution order
    pub fn labels(&self) -> &[String] {
        self.classifier.class_labels()
    }
}

impl std::fmt::Debug for EmbeddingStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingStack").finish_non_exhaustive()
    }
}

/// Fitted term vectorizer paired with its Naive-Bayes classifier
pub struct LexicalStack {
    pub vectorizer: Box<dyn TermVectorizer>,
    pub classifier: Box<dyn TermLogProbClassifier>,
}

impl LexicalStack {
    pub fn new(vectorizer: Box<dyn TermVectorizer>, classifier: Box<dyn TermLogProbClassifier>) -> Self {
        Self { vectorizer, classifier }
    }

    /// Identifier reported alongside explanations, e.g. `tfidf+ComplementNB`
    pub fn identifier(&self) -> String {
        format!("tfidf+{}", self.classifier.model_name())
    }

    /// Run the whole pipeline on raw text
    pub fn predict(&self, text: &str) -> Result<String> {
        let features = self.vectorizer.transform(text);
        self.classifier.predict(&features)
    }
}

impl std::fmt::Debug for LexicalStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalStack").finish_non_exhaustive()
    }
}

/// Source of model stacks; the only component doing model I/O
pub trait StackLoader: Send + Sync {
    fn load_embedding(&self) -> Result<EmbeddingStack>;

    fn load_lexical(&self) -> Result<LexicalStack>;
}

/// Outcome of [`ModelCache::preload`], one entry per stack
#[derive(Debug)]
pub struct PreloadReport {
    pub embedding: Result<()>,
    pub lexical: Result<()>,
}

impl PreloadReport {
    pub fn all_loaded(&self) -> bool {
        self.embedding.is_ok() && self.lexical.is_ok()
    }
}

/// Process-wide holder for both model stacks
pub struct ModelCache {
    loader: Arc<dyn StackLoader>,
    embedding: OnceLock<Arc<EmbeddingStack>>,
    lexical: OnceLock<Arc<LexicalStack>>,
    embedding_guard: Mutex<()>,
    lexical_guard: Mutex<()>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("embedding_loaded", &self.is_embedding_loaded())
            .field("lexical_loaded", &self.is_lexical_loaded())
            .finish()
    }
}

impl ModelCache {
    /// Create an empty cache; nothing is loaded until first use
    pub fn new(loader: Arc<dyn StackLoader>) -> Self {
        Self {
            loader,
            embedding: OnceLock::new(),
            lexical: OnceLock::new(),
            embedding_guard: Mutex::new(()),
            lexical_guard: Mutex::new(()),
        }
    }

    /// Embedding encoder + classifier, loading them on first call
    pub fn embedding_stack(&self) -> Result<Arc<EmbeddingStack>> {
        get_or_load(&self.embedding, &self.embedding_guard, "embedding", || {
            let stack = self.loader.load_embedding()?;
            info!(
                "Embedding stack ready: encoder '{}' ({} dims), labels {:?}",
                stack.embedder.name(),
                stack.embedder.dimension(),
                stack.labels()
            );
            Ok(stack)
        })
    }

    /// TF-IDF vectorizer + Naive Bayes, loading them on first call
    pub fn lexical_stack(&self) -> Result<Arc<LexicalStack>> {
        get_or_load(&self.lexical, &self.lexical_guard, "lexical", || {
            let stack = self.loader.load_lexical()?;
            info!(
                "Lexical stack ready: {} ({} terms), labels {:?}",
                stack.identifier(),
                stack.vectorizer.vocabulary().len(),
                stack.classifier.class_labels()
            );
            Ok(stack)
        })
    }

    pub fn is_embedding_loaded(&self) -> bool {
        self.embedding.get().is_some()
    }

    pub fn is_lexical_loaded(&self) -> bool {
        self.lexical.get().is_some()
    }

    /// Attempt to load both stacks; one failing does not stop the other
    pub fn preload(&self) -> PreloadReport {
        let embedding = self.embedding_stack().map(|_| ());
        if let Err(e) = &embedding {
            warn!("Embedding stack unavailable: {}", e);
        }

        let lexical = self.lexical_stack().map(|_| ());
        if let Err(e) = &lexical {
            warn!("Lexical stack unavailable: {}", e);
        }

        PreloadReport { embedding, lexical }
    }
}

/// Double-checked load: lock-free fast path, guard serialises the slow path
fn get_or_load<T>(
    slot: &OnceLock<Arc<T>>,
    guard: &Mutex<()>,
    name: &str,
    load: impl FnOnce() -> Result<T>,
) -> Result<Arc<T>> {
    if let Some(stack) = slot.get() {
        return Ok(Arc::clone(stack));
    }

    let _loading = guard.lock();

    // Another caller may have finished while we waited
    if let Some(stack) = slot.get() {
        return Ok(Arc::clone(stack));
    }

    let start = Instant::now();
    let stack = match load() {
        Ok(stack) => Arc::new(stack),
        Err(e) => {
            warn!("Failed to load {} stack: {}", name, e);
            return Err(match e {
                Error::ArtifactLoad(_) => e,
                other => Error::artifact(format!("{} stack: {}", name, other)),
            });
        }
    };

    // Only this thread publishes while the guard is held
    let _ = slot.set(Arc::clone(&stack));
    info!("Loaded {} stack in {:?}", name, start.elapsed());

    Ok(stack)
}
