//! In-process latency histograms and outcome counters for the translation
//! workflow. Histograms keep the last 1024 samples per metric.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

/// Well-known metric names.
pub mod metric_names {
    pub const GATE_CALL: &str = "t_gate_call";
    pub const STORE_REFRESH: &str = "t_store_refresh";
    pub const TRIGGER_TOTAL: &str = "t_trigger_total";

    pub const TRANSLATIONS_COMPLETED: &str = "translations_completed";
    pub const TRANSLATIONS_FAILED: &str = "translations_failed";
    pub const TRANSLATIONS_SKIPPED: &str = "translations_skipped";
    pub const TRANSLATIONS_CANCELLED: &str = "translations_cancelled";
}

const RING_CAPACITY: usize = 1024;

/// Measures from creation until [`TimingSpan::finish`].
pub struct TimingSpan {
    name: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    /// Record the elapsed time in milliseconds and return it.
    pub fn finish(self) -> f64 {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.registry.record(self.name, elapsed_ms);
        elapsed_ms
    }
}

struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
}

impl SampleRing {
    fn new() -> Self {
        Self {
            samples: vec![0.0; RING_CAPACITY],
            pos: 0,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % RING_CAPACITY;
        self.count = (self.count + 1).min(RING_CAPACITY);
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted = self.samples[..self.count].to_vec();
        sorted.sort_by(f64::total_cmp);
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        sorted[idx.min(self.count - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub count: usize,
}

#[derive(Default)]
pub struct MetricsRegistry {
    histograms: Mutex<HashMap<&'static str, SampleRing>>,
    counters: Mutex<HashMap<&'static str, u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str, value_ms: f64) {
        self.histograms
            .lock()
            .entry(name)
            .or_insert_with(SampleRing::new)
            .push(value_ms);
        tracing::trace!(metric = name, value_ms, "metric_recorded");
    }

    pub fn increment(&self, name: &'static str) {
        *self.counters.lock().entry(name).or_insert(0) += 1;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan {
            name,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        self.histograms
            .lock()
            .iter()
            .map(|(&name, ring)| {
                (
                    name.to_string(),
                    MetricSummary {
                        p50_ms: ring.percentile(50.0),
                        p95_ms: ring.percentile(95.0),
                        p99_ms: ring.percentile(99.0),
                        count: ring.count,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_recorded_samples() {
        let registry = MetricsRegistry::new();
        for v in 1..=100 {
            registry.record(metric_names::GATE_CALL, v as f64);
        }
        let summary = &registry.summary()[metric_names::GATE_CALL];
        assert_eq!(summary.count, 100);
        assert_eq!(summary.p50_ms, 51.0);
        assert_eq!(summary.p99_ms, 99.0);
    }

    #[test]
    fn ring_keeps_only_latest_samples() {
        let registry = MetricsRegistry::new();
        for _ in 0..RING_CAPACITY {
            registry.record(metric_names::STORE_REFRESH, 1000.0);
        }
        for _ in 0..RING_CAPACITY {
            registry.record(metric_names::STORE_REFRESH, 1.0);
        }
        let summary = &registry.summary()[metric_names::STORE_REFRESH];
        assert_eq!(summary.count, RING_CAPACITY);
        assert_eq!(summary.p99_ms, 1.0);
    }

    #[test]
    fn counters_start_at_zero() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.counter(metric_names::TRANSLATIONS_FAILED), 0);
        registry.increment(metric_names::TRANSLATIONS_FAILED);
        registry.increment(metric_names::TRANSLATIONS_FAILED);
        assert_eq!(registry.counter(metric_names::TRANSLATIONS_FAILED), 2);
    }
}
