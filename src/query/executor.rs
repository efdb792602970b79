use std::time::{Duration, Instant};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use crate::backend::{IndexBackend, KnnQuery, VectorSearcher};
use crate::core::config::BenchmarkConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::dataset::queries::QuerySet;
use crate::metrics::{BackendMetrics, MetricsAggregator};
use crate::query::{QueryJob, QueryResult};

/// Timing and derived metrics of one backend's query phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPhaseReport {
    pub backend: IndexBackend,
    pub elapsed_ms: f64,
    pub metrics: BackendMetrics,
}

/// Runs the fixed query set against a frozen searcher on a dedicated pool.
pub struct QueryExecutor<'a> {
    config: &'a BenchmarkConfig,
    pool: rayon::ThreadPool,
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / 1e6
}

impl<'a> QueryExecutor<'a> {
    pub fn new(config: &'a BenchmarkConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.query_threads.max(1))
            .thread_name(|i| format!("query-{}", i))
            .build()?;
        Ok(QueryExecutor { config, pool })
    }

    /// Jobs in query-file order, shaped for `backend`.
    pub fn jobs(&self, backend: IndexBackend, queries: &QuerySet) -> Vec<QueryJob> {
        queries
            .ids
            .iter()
            .zip(&queries.vectors)
            .map(|(&id, vector)| {
                let query = KnnQuery::for_backend(backend, self.config, vector.0.clone());
                QueryJob {
                    id,
                    vector: query.vector,
                    top_k: query.k,
                    tuning: query.tuning,
                }
            })
            .collect()
    }

    fn execute(&self, searcher: &dyn VectorSearcher, job: &QueryJob) -> QueryResult {
        let backend = searcher.backend();
        let query = KnnQuery {
            field: self.config.vector_column_name.clone(),
            vector: job.vector.clone(),
            k: job.top_k,
            tuning: job.tuning,
        };

        let start = Instant::now();
        let outcome = searcher.search(&query);
        let latency_ms = millis(start.elapsed());

        match outcome {
            Ok(raw) => {
                let ranked = backend.best_first(raw);
                QueryResult {
                    backend,
                    query_id: job.id,
                    docs: ranked.doc_ids(),
                    scores: ranked.scores(),
                    latency_ms,
                    error: None,
                }
            }
            Err(e) => {
                let e = Error::new(ErrorKind::QueryExecution, format!("query {}: {}", job.id, e));
                warn!(backend = %backend, error = %e, "Query failed");
                QueryResult::failed(backend, job.id, latency_ms, e.to_string())
            }
        }
    }

    /// Execute every query once and record each outcome, failed ones
    /// included, into `metrics`.
    pub fn run(
        &self,
        searcher: &dyn VectorSearcher,
        queries: &QuerySet,
        metrics: &MetricsAggregator,
    ) -> QueryPhaseReport {
        let backend = searcher.backend();
        let jobs = self.jobs(backend, queries);
        info!(backend = %backend, queries = jobs.len(), threads = self.pool.current_num_threads(), "Running queries");

        let start = Instant::now();
        self.pool.install(|| {
            jobs.par_iter().for_each(|job| metrics.record(self.execute(searcher, job)));
        });
        let elapsed = start.elapsed();

        let summary = metrics.summarize(backend, elapsed);
        info!(
            backend = %backend,
            completed = summary.completed,
            failed = summary.failed,
            qps = summary.throughput_qps,
            mean_ms = summary.mean_latency_ms,
            p99_ms = summary.p99_latency_ms,
            "Query phase finished"
        );
        QueryPhaseReport {
            backend,
            elapsed_ms: millis(elapsed),
            metrics: summary,
        }
    }
}
