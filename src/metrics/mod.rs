pub mod aggregator;

pub use aggregator::{BackendMetrics, BenchmarkMetrics, MetricsAggregator};
