// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for zonekeeper.
//!
//! All metrics carry the `zonekeeper` namespace prefix.
//!
//! # Metrics Categories
//!
//! - **Mutation Metrics** - add/update/delete outcomes and durations
//! - **Query Metrics** - whether records came from a zone transfer or the fallback queries
//! - **Discovery Metrics** - how zone listings were produced
//! - **Error Metrics** - failures by stable reason code
//!
//! # Example
//!
//! ```rust,no_run
//! use zonekeeper::metrics::{gather_metrics, record_mutation};
//!
//! record_mutation("add", "success", std::time::Duration::from_millis(250));
//! println!("{}", gather_metrics().unwrap_or_default());
//! ```

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::error;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all zonekeeper metrics
const METRICS_NAMESPACE: &str = "zonekeeper";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The registered metric families.
pub struct Metrics {
    /// Mutations by operation (`add`, `update`, `delete`) and outcome
    /// (`success`, `reload_failed`, `not_found`, `failure`)
    pub mutations_total: CounterVec,
    /// Mutation duration in seconds by operation
    pub mutation_duration_seconds: HistogramVec,
    /// Record listings by source (`transfer`, `fallback`)
    pub record_queries_total: CounterVec,
    /// Zone listings by discovery method (`ssh_automatic`, `fallback`)
    pub zone_discoveries_total: CounterVec,
    /// Errors by reason code
    pub errors_total: CounterVec,
}

impl Metrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let mutations_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_mutations_total"),
                "Total number of zone-file mutations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        let mutation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_mutation_duration_seconds"),
                "Duration of zone-file mutations in seconds by operation",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
            &["operation"],
        )?;
        let record_queries_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_record_queries_total"),
                "Total number of record listings by source",
            ),
            &["source"],
        )?;
        let zone_discoveries_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_zone_discoveries_total"),
                "Total number of zone listings by discovery method",
            ),
            &["method"],
        )?;
        let errors_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_errors_total"),
                "Total number of errors by reason",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(mutations_total.clone()))?;
        registry.register(Box::new(mutation_duration_seconds.clone()))?;
        registry.register(Box::new(record_queries_total.clone()))?;
        registry.register(Box::new(zone_discoveries_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            mutations_total,
            mutation_duration_seconds,
            record_queries_total,
            zone_discoveries_total,
            errors_total,
        })
    }
}

/// Metrics registered in [`METRICS_REGISTRY`]; `None` if registration failed.
pub static METRICS: LazyLock<Option<Metrics>> = LazyLock::new(|| {
    Metrics::new(&METRICS_REGISTRY)
        .map_err(|e| error!("Failed to register metrics: {e}"))
        .ok()
});

// ============================================================================
// Recording Helpers
// ============================================================================

/// Record a finished mutation
///
/// # Arguments
/// * `operation` - `add`, `update` or `delete`
/// * `outcome` - `success`, `reload_failed`, `not_found` or `failure`
/// * `duration` - Time from validation to result
pub fn record_mutation(operation: &str, outcome: &str, duration: Duration) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics
            .mutations_total
            .with_label_values(&[operation, outcome])
            .inc();
        metrics
            .mutation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }
}

/// Record where a record listing came from (`transfer` or `fallback`)
pub fn record_query_source(source: &str) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics.record_queries_total.with_label_values(&[source]).inc();
    }
}

/// Record how a zone listing was produced
pub fn record_discovery(method: &str) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics
            .zone_discoveries_total
            .with_label_values(&[method])
            .inc();
    }
}

/// Record an error by its stable reason code
pub fn record_error(reason: &str) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics.errors_total.with_label_values(&[reason]).inc();
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
