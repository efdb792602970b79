use std::collections::BTreeMap;
use std::time::Duration;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};
use crate::backend::IndexBackend;
use crate::query::QueryResult;

/// Derived query-phase metrics for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackendMetrics {
    pub query_time_ms: f64,
    pub completed: usize,
    pub failed: usize,
    pub throughput_qps: f64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile over an ascending slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * sorted.len().saturating_sub(1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Thread-safe, append-only collection of query outcomes.
#[derive(Default)]
pub struct MetricsAggregator {
    results: Mutex<Vec<QueryResult>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: QueryResult) {
        self.results.lock().push(result);
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    pub fn results(&self) -> Vec<QueryResult> {
        self.results.lock().clone()
    }

    pub fn results_for(&self, backend: IndexBackend) -> Vec<QueryResult> {
        self.results
            .lock()
            .iter()
            .filter(|r| r.backend == backend)
            .cloned()
            .collect()
    }

    /// Throughput counts completed queries only. Both throughput and mean
    /// latency are zero when nothing completed or no time elapsed.
    pub fn summarize(&self, backend: IndexBackend, elapsed: Duration) -> BackendMetrics {
        let (mut latencies, failed) = {
            let results = self.results.lock();
            let mut latencies = Vec::new();
            let mut failed = 0;
            for r in results.iter().filter(|r| r.backend == backend) {
                if r.is_ok() {
                    latencies.push(r.latency_ms);
                } else {
                    failed += 1;
                }
            }
            (latencies, failed)
        };
        latencies.sort_by(f64::total_cmp);

        let completed = latencies.len();
        let secs = elapsed.as_secs_f64();
        let throughput_qps = if completed == 0 || secs <= 0.0 { 0.0 } else { completed as f64 / secs };

        BackendMetrics {
            query_time_ms: elapsed.as_nanos() as f64 / 1e6,
            completed,
            failed,
            throughput_qps,
            mean_latency_ms: mean(&latencies),
            p50_latency_ms: percentile(&latencies, 50.0),
            p95_latency_ms: percentile(&latencies, 95.0),
            p99_latency_ms: percentile(&latencies, 99.0),
        }
    }
}

/// Flat metric map written to the JSON summary, keyed
/// `<backend>-<metric>` (e.g. `graph-query-throughput`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkMetrics {
    values: BTreeMap<String, f64>,
}

impl BenchmarkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, backend: IndexBackend, metric: &str, value: f64) {
        self.values.insert(format!("{}-{}", backend.name(), metric), value);
    }

    pub fn record_parse_time(&mut self, millis: f64) {
        self.values.insert("dataset-parse-time".to_string(), millis);
    }

    pub fn record_indexing(&mut self, backend: IndexBackend, millis: f64) {
        self.put(backend, "indexing-time", millis);
    }

    pub fn record_queries(&mut self, backend: IndexBackend, metrics: &BackendMetrics) {
        self.put(backend, "query-time", metrics.query_time_ms);
        self.put(backend, "query-throughput", metrics.throughput_qps);
        self.put(backend, "mean-latency", metrics.mean_latency_ms);
        self.put(backend, "p50-latency", metrics.p50_latency_ms);
        self.put(backend, "p95-latency", metrics.p95_latency_ms);
        self.put(backend, "p99-latency", metrics.p99_latency_ms);
        self.put(backend, "completed-queries", metrics.completed as f64);
        self.put(backend, "failed-queries", metrics.failed as f64);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ok(backend: IndexBackend, id: usize, latency_ms: f64) -> QueryResult {
        QueryResult {
            backend,
            query_id: id,
            docs: vec![1],
            scores: vec![0.5],
            latency_ms,
            error: None,
        }
    }

    #[test]
    fn records_from_many_threads() {
        let agg = Arc::new(MetricsAggregator::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let agg = agg.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        agg.record(ok(IndexBackend::Graph, t * 100 + i, 1.0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(agg.len(), 400);
    }

    #[test]
    fn summarizes_completed_queries_only() {
        let agg = MetricsAggregator::new();
        for (i, ms) in [4.0, 1.0, 3.0, 2.0].into_iter().enumerate() {
            agg.record(ok(IndexBackend::Graph, i, ms));
        }
        agg.record(QueryResult::failed(IndexBackend::Graph, 9, 50.0, "boom".into()));
        agg.record(ok(IndexBackend::Accelerated, 0, 100.0));

        let m = agg.summarize(IndexBackend::Graph, Duration::from_secs(2));
        assert_eq!(m.completed, 4);
        assert_eq!(m.failed, 1);
        assert_eq!(m.throughput_qps, 2.0);
        assert_eq!(m.mean_latency_ms, 2.5);
        assert_eq!(m.p50_latency_ms, 3.0);
        assert_eq!(m.p99_latency_ms, 4.0);
        assert_eq!(m.query_time_ms, 2000.0);
    }

    #[test]
    fn empty_or_instant_phases_do_not_divide_by_zero() {
        let agg = MetricsAggregator::new();
        let m = agg.summarize(IndexBackend::Accelerated, Duration::from_secs(1));
        assert_eq!((m.throughput_qps, m.mean_latency_ms), (0.0, 0.0));

        agg.record(ok(IndexBackend::Accelerated, 0, 1.0));
        let m = agg.summarize(IndexBackend::Accelerated, Duration::ZERO);
        assert_eq!(m.throughput_qps, 0.0);
        assert_eq!(m.mean_latency_ms, 1.0);
    }

    #[test]
    fn metric_keys_are_prefixed_by_backend() {
        let agg = MetricsAggregator::new();
        agg.record(ok(IndexBackend::Graph, 0, 1.0));
        let mut metrics = BenchmarkMetrics::new();
        metrics.record_indexing(IndexBackend::Graph, 12.5);
        metrics.record_queries(IndexBackend::Graph, &agg.summarize(IndexBackend::Graph, Duration::from_secs(1)));

        assert_eq!(metrics.get("graph-indexing-time"), Some(12.5));
        assert_eq!(metrics.get("graph-query-throughput"), Some(1.0));
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["graph-mean-latency"], 1.0);
    }
}
