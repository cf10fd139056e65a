//! Metrics seam: optional counters and histograms with a no-op default.
//!
//! The pipeline instruments itself through [`MetricsSink`]; when no backend
//! is wired in, [`NoopMetrics`] swallows every call, so the core carries zero
//! hard dependency on a telemetry library. Label values stay low-cardinality:
//! entity type, component, skip reason, outcome.

use std::time::Instant;

/// Metric names emitted by the pipeline.
pub const ENTITIES_PER_MAIL: &str = "entities_per_mail";
pub const EXTRACTION_LATENCY: &str = "extraction_latency";
pub const ERRORS_TOTAL: &str = "errors_total";
pub const NER_SKIP_TOTAL: &str = "ner_skip_total";
pub const PIPELINE_RUNS: &str = "pipeline_runs";

/// Destination for pipeline metrics.
pub trait MetricsSink: Send + Sync + std::fmt::Debug {
    /// Increment a counter by `value`.
    fn counter(&self, name: &str, labels: &[(&str, &str)], value: u64);

    /// Record one observation into a histogram.
    fn histogram(&self, name: &str, labels: &[(&str, &str)], value: f64);
}

/// Sink that discards everything. The default when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn counter(&self, _name: &str, _labels: &[(&str, &str)], _value: u64) {}

    fn histogram(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
}

/// Scoped latency recorder. [`Timer::stop`] reports the elapsed milliseconds
/// into the `extraction_latency{component}` histogram and returns them for
/// `meta.component_timings_ms`.
#[derive(Debug)]
pub struct Timer<'a> {
    sink: &'a dyn MetricsSink,
    component: &'a str,
    started: Instant,
}

impl<'a> Timer<'a> {
    pub fn start(sink: &'a dyn MetricsSink, component: &'a str) -> Self {
        Self {
            sink,
            component,
            started: Instant::now(),
        }
    }

    pub fn stop(self) -> f64 {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.sink.histogram(
            EXTRACTION_LATENCY,
            &[("component", self.component)],
            elapsed_ms,
        );
        elapsed_ms
    }
}
