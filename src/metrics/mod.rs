//! Prometheus metrics for coupon ingestion
//!
//! Tracks lines streamed and read errors per source, load durations, the size
//! of the registry and validation verdicts.
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! Until then (or if registration fails) every recording function is a no-op.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all ingest metrics
struct IngestMetrics {
    lines_read: CounterVec,
    read_errors: CounterVec,
    load_duration: HistogramVec,
    registry_codes: Gauge,
    validations: CounterVec,
}

/// Global storage for ingest metrics
static INGEST_METRICS: OnceLock<IngestMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = IngestMetrics {
        lines_read: register_counter_vec!(
            "couponbase_ingest_lines_total",
            "Lines streamed from each coupon source",
            &["source"]
        )?,
        read_errors: register_counter_vec!(
            "couponbase_ingest_read_errors_total",
            "Read errors that ended a coupon source early",
            &["source"]
        )?,
        load_duration: register_histogram_vec!(
            "couponbase_ingest_load_duration_seconds",
            "Time spent loading one coupon source",
            &["source"],
            vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
        )?,
        registry_codes: register_gauge!(
            "couponbase_registry_codes",
            "Distinct coupon codes held by the registry"
        )?,
        validations: register_counter_vec!(
            "couponbase_validations_total",
            "Coupon validations by verdict",
            &["verdict"]
        )?,
    };

    INGEST_METRICS
        .set(metrics)
        .map_err(|_| "Ingest metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    INGEST_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record lines streamed from a source
pub fn record_lines_read(source: &str, lines: u64) {
    if let Some(m) = INGEST_METRICS.get() {
        m.lines_read
            .with_label_values(&[source])
            .inc_by(lines as f64);
    }
}

/// Record a read error that ended a source early
pub fn record_read_error(source: &str) {
    if let Some(m) = INGEST_METRICS.get() {
        m.read_errors.with_label_values(&[source]).inc();
    }
}

/// Update the registry size gauge
pub fn set_registry_codes(codes: usize) {
    if let Some(m) = INGEST_METRICS.get() {
        m.registry_codes.set(codes as f64);
    }
}

/// Record a validation verdict
pub fn record_validation(verdict: &str) {
    if let Some(m) = INGEST_METRICS.get() {
        m.validations.with_label_values(&[verdict]).inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a load timer for a source
pub fn start_load_timer(source: &str) -> MetricsTimer {
    match INGEST_METRICS.get() {
        Some(m) => MetricsTimer::new(m.load_duration.with_label_values(&[source]).start_timer()),
        None => MetricsTimer::noop(),
    }
}
