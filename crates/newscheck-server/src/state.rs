use crate::config::ServerConfig;
use crate::extract::UrlTextFetcher;
use metrics_exporter_prometheus::PrometheusHandle;
use newscheck_classifiers::{
    ArtifactLoader, ArtifactStore, Explainer, ModelCache, PatternDetector, PrimaryClassifier, StackLoader,
};
use newscheck_telemetry::PredictionLog;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Both model stacks, loaded on first use
    pub cache: Arc<ModelCache>,

    pub primary: PrimaryClassifier,
    pub explainer: Explainer,

    /// Prediction history behind the metrics endpoint
    pub log: Arc<PredictionLog>,

    pub fetcher: UrlTextFetcher,

    /// Absent when no Prometheus recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed by the artifact directory named in `config`
    pub fn new(config: ServerConfig, metrics_handle: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let store = ArtifactStore::with_files(&config.artifacts_dir, config.artifact_files.clone());
        let loader = ArtifactLoader::new(store).with_device(config.device_type()?);
        Self::with_loader(config, Arc::new(loader), metrics_handle)
    }

    /// State with a caller-supplied model source
    pub fn with_loader(
        config: ServerConfig,
        loader: Arc<dyn StackLoader>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let cache = Arc::new(ModelCache::new(loader));
        let detector = Arc::new(PatternDetector::new(config.taxonomy())?);
        let log = Arc::new(PredictionLog::open(&config.prediction_log)?);
        let fetcher = UrlTextFetcher::new(&config.fetch, config.max_text_chars)?;

        Ok(Self {
            primary: PrimaryClassifier::new(Arc::clone(&cache), detector),
            explainer: Explainer::new(Arc::clone(&cache)),
            cache,
            log,
            fetcher,
            config: Arc::new(config),
            metrics_handle,
        })
    }
}
