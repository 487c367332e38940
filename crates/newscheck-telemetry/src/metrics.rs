//! Metrics collection and reporting
//!
//! [`LabelStats`] aggregates logged predictions for the JSON `/metrics`
//! summary. The `record_*` helpers feed the Prometheus recorder installed by
//! the binary; without a recorder they are no-ops.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REQUESTS_TOTAL: &str = "newscheck_requests_total";
pub const PREDICTIONS_TOTAL: &str = "newscheck_predictions_total";
pub const ABSTENTIONS_TOTAL: &str = "newscheck_abstentions_total";
pub const ERRORS_TOTAL: &str = "newscheck_errors_total";
pub const INFERENCE_LATENCY_US: &str = "newscheck_inference_latency_us";

/// Register descriptions for every metric this crate emits
pub fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of requests by endpoint");
    metrics::describe_counter!(PREDICTIONS_TOTAL, "Total number of predictions by label");
    metrics::describe_counter!(ABSTENTIONS_TOTAL, "Predictions below the abstain threshold");
    metrics::describe_counter!(ERRORS_TOTAL, "Total number of errors by kind");
    metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Model inference latency in microseconds"
    );
}

pub fn record_request(endpoint: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_prediction(label: &str, abstain: bool) {
    metrics::counter!(PREDICTIONS_TOTAL, "label" => label.to_string()).increment(1);
    if abstain {
        metrics::counter!(ABSTENTIONS_TOTAL).increment(1);
    }
}

pub fn record_error(kind: &'static str) {
    metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_inference_latency(endpoint: &'static str, latency_us: u64) {
    metrics::histogram!(INFERENCE_LATENCY_US, "endpoint" => endpoint).record(latency_us as f64);
}

#[derive(Debug, Clone, Copy, Default)]
struct LabelAccumulator {
    count: u64,
    score_sum: f64,
}

/// Running per-label totals of logged predictions
#[derive(Debug, Clone, Default)]
pub struct LabelStats {
    total: u64,
    labels: BTreeMap<String, LabelAccumulator>,
}

impl LabelStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction
    pub fn record(&mut self, label: &str, score: f64) {
        self.total += 1;
        let acc = self.labels.entry(label.to_string()).or_default();
        acc.count += 1;
        acc.score_sum += score;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current summary, labels in lexicographic order
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total: self.total,
            by_label: self
                .labels
                .iter()
                .map(|(label, acc)| LabelSummary {
                    label: label.clone(),
                    count: acc.count,
                    avg_score: if acc.count == 0 {
                        0.0
                    } else {
                        acc.score_sum / acc.count as f64
                    },
                })
                .collect(),
        }
    }
}

/// Per-label line of the metrics summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub label: String,
    pub count: u64,
    pub avg_score: f64,
}

/// Body of the JSON metrics endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total: u64,
    pub by_label: Vec<LabelSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_stats() {
        let mut stats = LabelStats::new();
        stats.record("Real", 0.8);
        stats.record("Fake", 0.9);
        stats.record("Real", 0.6);

        let summary = stats.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_label.len(), 2);
        assert_eq!(summary.by_label[0].label, "Fake");
        assert_eq!(summary.by_label[0].count, 1);
        assert_eq!(summary.by_label[1].label, "Real");
        assert_eq!(summary.by_label[1].count, 2);
        assert!((summary.by_label[1].avg_score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = LabelStats::new().summary();
        assert_eq!(summary.total, 0);
        assert!(summary.by_label.is_empty());
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"total":0,"by_label":[]}"#
        );
    }

    #[test]
    fn test_recorders_without_exporter() {
        // no global recorder installed: must not panic
        record_request("predict");
        record_prediction("Real", true);
        record_error("inference");
        record_inference_latency("predict", 1200);
    }
}
