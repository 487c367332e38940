//! NewsCheck Telemetry
//!
//! Persistence and metrics for served predictions.
//!
//! Provides:
//! - An append-only JSON-lines prediction log that survives restarts
//! - Per-label counts and average scores for the metrics endpoint
//! - Prometheus counters and latency histograms

pub mod metrics;
pub mod persistence;

pub use metrics::{LabelStats, LabelSummary, MetricsSummary};
pub use persistence::{PredictionLog, PredictionRecord};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{LabelStats, MetricsSummary};
    pub use crate::persistence::{PredictionLog, PredictionRecord};
}
