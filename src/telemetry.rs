//! Injected logging and metrics handle.
//!
//! Each stage receives a [`Telemetry`] in its constructor instead of reaching
//! for process-wide state. The handle carries a `tracing` span the stage runs
//! inside, plus a metrics recorder shared by the stages of one extractor.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::Span;

/// Aggregated statistics for one metric name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }
}

/// Thread-safe named-metric accumulator.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    metrics: Mutex<BTreeMap<String, MetricStats>>,
}

impl MetricsRecorder {
    pub fn record(&self, name: &str, value: f64) {
        // A poisoned lock only means another recorder panicked mid-insert;
        // the map itself is still usable.
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics
            .entry(name.to_string())
            .and_modify(|s| s.add(value))
            .or_insert_with(|| MetricStats::first(value));
    }

    pub fn get(&self, name: &str) -> Option<MetricStats> {
        let metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.get(name).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricStats> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Logging span plus metrics sink handed to every pipeline stage.
#[derive(Debug, Clone)]
pub struct Telemetry {
    span: Span,
    metrics: Arc<MetricsRecorder>,
}

impl Telemetry {
    /// Root handle for one extractor.
    pub fn new(component: &str) -> Self {
        Self {
            span: tracing::info_span!("tabscan", component),
            metrics: Arc::new(MetricsRecorder::default()),
        }
    }

    /// Handle that logs nowhere in particular and keeps its own metrics.
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
            metrics: Arc::new(MetricsRecorder::default()),
        }
    }

    /// Child handle for one stage; shares the parent's metrics recorder.
    pub fn stage(&self, stage: &'static str) -> Self {
        Self {
            span: tracing::debug_span!(parent: &self.span, "stage", stage),
            metrics: Arc::clone(&self.metrics),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn record(&self, name: &str, value: f64) {
        self.metrics.record(name, value);
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate_per_name() {
        let telemetry = Telemetry::disabled();
        let stage = telemetry.stage("detect");
        telemetry.record("detect_ms", 4.0);
        stage.record("detect_ms", 2.0);
        stage.record("fragments", 7.0);

        let stats = telemetry.metrics().get("detect_ms").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(telemetry.metrics().snapshot().len(), 2);
    }
}
