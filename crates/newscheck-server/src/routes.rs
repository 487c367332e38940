//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use newscheck_core::{Error, ExplanationResult, InputSource, PredictionResult};
use newscheck_telemetry::metrics::{record_error, record_inference_latency, record_prediction, record_request};
use newscheck_telemetry::{MetricsSummary, PredictionRecord};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/explain", post(explain))
        .route("/metrics", get(metrics_summary))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": "newscheck",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Body of the predict and explain endpoints
#[derive(Debug, Default, Deserialize)]
pub struct NewsInput {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

/// Validated text and where it came from
struct ResolvedText {
    text: String,
    source: InputSource,
    url: Option<String>,
}

/// Inline text wins and is passed on whole; the URL is only fetched when no
/// text was sent, and only URL text is capped at `max_text_chars`
async fn resolve_text(state: &AppState, input: NewsInput) -> Result<ResolvedText, AppError> {
    let config = &state.config;
    let inline = input.text.as_deref().map(str::trim).unwrap_or_default();

    let resolved = match input.url.filter(|u| inline.is_empty() && !u.trim().is_empty()) {
        Some(url) => ResolvedText {
            text: state.fetcher.fetch_text(url.trim()).await?,
            source: InputSource::Url,
            url: Some(url),
        },
        None => ResolvedText {
            text: inline.to_string(),
            source: InputSource::Text,
            url: None,
        },
    };

    if resolved.text.chars().count() < config.min_text_chars {
        return Err(Error::invalid_input(format!(
            "Provide at least {} characters of text or a URL with readable content",
            config.min_text_chars
        ))
        .into());
    }

    Ok(resolved)
}

fn parse_input(payload: Result<Json<NewsInput>, JsonRejection>) -> Result<NewsInput, AppError> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| Error::invalid_input(rejection.body_text()).into())
}

/// Classify text with the primary classifier and log the prediction
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<NewsInput>, JsonRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    record_request("predict");

    let resolved = resolve_text(&state, parse_input(payload)?).await?;
    debug!(
        source = resolved.source.as_str(),
        chars = resolved.text.chars().count(),
        "Predict request"
    );

    let primary = state.primary.clone();
    let log = state.log.clone();
    let threshold = state.config.abstain_threshold;

    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || -> newscheck_core::Result<PredictionResult> {
        let result = primary.predict(&resolved.text, threshold)?;
        let record = PredictionRecord::new(resolved.source, resolved.url.as_deref(), &resolved.text, &result);
        log.append(&record)?;
        Ok(result)
    })
    .await
    .map_err(|e| Error::internal(format!("Prediction task failed: {}", e)))??;
    record_inference_latency("predict", start.elapsed().as_micros() as u64);
    record_prediction(&result.label, result.abstain);

    info!(
        label = %result.label,
        score = result.score,
        abstain = result.abstain,
        pattern = ?result.pattern,
        "Prediction served"
    );

    Ok(Json(result))
}

/// Rank the terms behind the lexical pipeline's verdict
async fn explain(
    State(state): State<AppState>,
    payload: Result<Json<NewsInput>, JsonRejection>,
) -> Result<Json<ExplanationResult>, AppError> {
    record_request("explain");

    let resolved = resolve_text(&state, parse_input(payload)?).await?;

    let explainer = state.explainer.clone();
    let top_k = state.config.top_k;

    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || explainer.explain(&resolved.text, top_k))
        .await
        .map_err(|e| Error::internal(format!("Explanation task failed: {}", e)))??;
    record_inference_latency("explain", start.elapsed().as_micros() as u64);

    debug!(
        predicted = %result.predicted_by_tfidf,
        terms = result.top_terms.len(),
        "Explanation served"
    );

    Ok(Json(result))
}

async fn metrics_summary(State(state): State<AppState>) -> Json<MetricsSummary> {
    record_request("metrics");
    Json(state.log.summary())
}

async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Prometheus exporter not installed").into_response(),
    }
}

/// Handler error, rendered as `{"error": {"message", "type"}}`
#[derive(Debug)]
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::ArtifactLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.0.kind();
        let message = self.0.to_string();

        record_error(kind);
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
