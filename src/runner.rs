use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use crate::backend::accelerated::AcceleratedSearcher;
use crate::backend::graph::GraphSearcher;
use crate::backend::native::{load_binding, AcceleratorBinding};
use crate::backend::{IndexBackend, VectorSearcher};
use crate::core::config::{BenchmarkConfig, IngestMode};
use crate::core::error::{ErrorKind, Result};
use crate::dataset::ingestor::{load_dataset, DatasetIngestor, LoadedDataset};
use crate::dataset::queries::{load_queries, QuerySet};
use crate::indexing::{IndexingCoordinator, IndexingReport};
use crate::metrics::{BenchmarkMetrics, MetricsAggregator};
use crate::query::{QueryExecutor, QueryResult};
use crate::store::format::high_dimension_selector;
use crate::store::reader::IndexReader;
use crate::store::writer::{IndexWriter, WriterConfig};

/// Everything a finished benchmark run reports.
#[derive(Debug)]
pub struct BenchmarkOutcome {
    pub metrics: BenchmarkMetrics,
    pub indexing: Vec<IndexingReport>,
    pub results: Vec<QueryResult>,
    /// Backends that could not run, with the reason.
    pub skipped: Vec<(IndexBackend, String)>,
}

struct Inputs {
    queries: QuerySet,
    dataset: Option<LoadedDataset>,
}

/// Startup: everything here is fatal on failure.
fn prepare(config: &BenchmarkConfig) -> Result<Inputs> {
    config.validate()?;
    config.log_arguments();

    let queries = load_queries(&config.query_file, config.vector_dimension)?;
    let dataset = match config.ingest_mode {
        IngestMode::Indexed => Some(load_dataset(config)?),
        // opened per backend; fail early if it cannot be opened at all
        IngestMode::Streaming => {
            DatasetIngestor::open(config)?;
            None
        }
    };
    Ok(Inputs { queries, dataset })
}

fn open_writer(config: &BenchmarkConfig) -> Result<Arc<IndexWriter>> {
    let field = &config.vector_column_name;
    let writer = IndexWriter::open(WriterConfig {
        vector_field: field.clone(),
        dimension: config.vector_dimension,
        merge_strategy: config.merge_strategy,
        format_selector: high_dimension_selector(field, config.vector_dimension, config.graph),
    })?;
    Ok(Arc::new(writer))
}

fn ingest(config: &BenchmarkConfig, backend: IndexBackend, inputs: &Inputs) -> Result<(Arc<IndexWriter>, IndexingReport)> {
    let writer = open_writer(config)?;
    let coordinator = IndexingCoordinator::new(config, backend, writer.clone());
    let report = match &inputs.dataset {
        Some(dataset) => coordinator.index_loaded(dataset)?,
        None => coordinator.stream(DatasetIngestor::open(config)?)?,
    };

    let indexed = writer.snapshot().doc_count;
    if indexed != report.docs_added {
        warn!(backend = %backend, indexed, added = report.docs_added, "Committed document count differs from added count");
    }
    Ok((writer, report))
}

/// Index and query one backend. Returns its indexing report; query results
/// go to `aggregator`.
fn run_backend(
    config: &BenchmarkConfig,
    backend: IndexBackend,
    binding: Option<&Arc<dyn AcceleratorBinding>>,
    inputs: &Inputs,
    executor: &QueryExecutor,
    aggregator: &MetricsAggregator,
    metrics: &mut BenchmarkMetrics,
) -> Result<IndexingReport> {
    info!(backend = %backend, "Starting backend");
    let (writer, mut report) = ingest(config, backend, inputs)?;
    let stats = writer.stats();
    info!(
        backend = %backend,
        docs = stats.committed_documents,
        segments = stats.segment_count,
        version = stats.snapshot_version,
        commits = stats.commits,
        max_conn = stats.max_connections,
        beam_width = stats.beam_width,
        "Index frozen"
    );
    let reader = Arc::new(IndexReader::open(writer.snapshot()));

    let started = Instant::now();
    let searcher: Box<dyn VectorSearcher> = match (backend, binding) {
        (IndexBackend::Graph, _) => Box::new(GraphSearcher::new(reader, &config.vector_column_name, config.graph)?),
        (IndexBackend::Accelerated, Some(binding)) => Box::new(AcceleratedSearcher::new(
            &reader,
            &config.vector_column_name,
            binding.clone(),
            config.accelerated,
        )?),
        (IndexBackend::Accelerated, None) => {
            return Err(crate::core::error::Error::native("no accelerator binding loaded"));
        }
    };
    // the accelerated index is built from the committed snapshot, so its
    // build belongs to indexing time
    report.elapsed_ms += started.elapsed().as_nanos() as f64 / 1e6;
    metrics.record_indexing(backend, report.elapsed_ms);

    let phase = executor.run(searcher.as_ref(), &inputs.queries, aggregator);
    metrics.record_queries(backend, &phase.metrics);
    Ok(report)
}

/// Run both backends over the same dataset and query set.
///
/// Startup failures (bad configuration, unreadable dataset or query file) are
/// returned as errors, as is a dataset read that breaks off mid-stream. A
/// missing native library or any other failure inside one backend only skips
/// that backend.
pub fn run_benchmark(config: &BenchmarkConfig) -> Result<BenchmarkOutcome> {
    let inputs = prepare(config)?;
    let mut metrics = BenchmarkMetrics::new();
    if let Some(dataset) = &inputs.dataset {
        metrics.record_parse_time(dataset.parse_time.as_nanos() as f64 / 1e6);
    }

    let mut skipped = Vec::new();
    let binding = match load_binding(config.native_library.as_deref()) {
        Ok(binding) => Some(binding),
        Err(e) => {
            error!(error = %e, "Accelerated backend disabled");
            skipped.push((IndexBackend::Accelerated, e.to_string()));
            None
        }
    };

    let executor = QueryExecutor::new(config)?;
    let aggregator = MetricsAggregator::new();
    let mut indexing = Vec::new();

    for backend in IndexBackend::ALL {
        if backend == IndexBackend::Accelerated && binding.is_none() {
            continue;
        }
        match run_backend(config, backend, binding.as_ref(), &inputs, &executor, &aggregator, &mut metrics) {
            Ok(report) => indexing.push(report),
            Err(e) if e.kind == ErrorKind::Io => {
                error!(backend = %backend, error = %e, "Dataset access failed");
                return Err(e);
            }
            Err(e) => {
                error!(backend = %backend, error = %e, "Backend run failed");
                skipped.push((backend, e.to_string()));
            }
        }
    }

    Ok(BenchmarkOutcome {
        metrics,
        indexing,
        results: aggregator.results(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use crate::backend::native::EMULATED;

    fn write_inputs(dir: &std::path::Path, rows: usize, queries: usize) -> (std::path::PathBuf, std::path::PathBuf) {
        let data = dir.join("data.csv");
        let mut text = String::from("id,title,text,emb\n");
        for i in 0..rows {
            text.push_str(&format!("{},title {},body,\"[{}, {}, 0.5, 1]\"\n", i, i, i % 17, i % 5));
        }
        fs::write(&data, text).unwrap();

        let query_file = dir.join("queries.txt");
        let lines: Vec<String> = (0..queries).map(|i| format!("[{}, 1, 0.5, 1]", i)).collect();
        fs::write(&query_file, lines.join("\n")).unwrap();
        (data, query_file)
    }

    fn config(dir: &std::path::Path, mode: IngestMode, native: Option<&str>) -> BenchmarkConfig {
        let (dataset_file, query_file) = write_inputs(dir, 300, 12);
        BenchmarkConfig {
            dataset_file,
            query_file,
            vector_column_index: 3,
            vector_column_name: "emb".into(),
            num_docs: 1000,
            vector_dimension: 4,
            commit_frequency: 64,
            batch_size: 64,
            top_k: 5,
            graph_writer_threads: 3,
            query_threads: 2,
            ingest_mode: mode,
            native_library: native.map(str::to_string),
            output_dir: dir.to_path_buf(),
            ..BenchmarkConfig::default()
        }
    }

    #[test]
    fn both_backends_index_every_row_and_agree_on_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), IngestMode::Indexed, Some(EMULATED));
        let outcome = run_benchmark(&config).unwrap();

        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.indexing.len(), 2);
        assert!(outcome.indexing.iter().all(|r| r.docs_added == 300));
        assert_eq!(outcome.results.len(), 24);
        assert!(outcome.metrics.get("accelerated-indexing-time").is_some());
        assert_eq!(outcome.metrics.get("graph-completed-queries"), Some(12.0));

        // exact search on both sides: best-first lists must match
        for id in 0..12 {
            let pick = |b: IndexBackend| {
                outcome.results.iter().find(|r| r.backend == b && r.query_id == id).unwrap().clone()
            };
            let graph = pick(IndexBackend::Graph);
            let accel = pick(IndexBackend::Accelerated);
            assert_eq!(graph.scores, accel.scores);
            assert!(graph.scores.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn streaming_mode_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), IngestMode::Streaming, Some(EMULATED));
        let outcome = run_benchmark(&config).unwrap();
        assert!(outcome.indexing.iter().all(|r| r.mode == IngestMode::Streaming && r.docs_added == 300));
        assert!(outcome.metrics.get("dataset-parse-time").is_none());
    }

    #[test]
    fn missing_native_library_only_skips_accelerated() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), IngestMode::Indexed, Some("/nonexistent/libknn.so"));
        let outcome = run_benchmark(&config).unwrap();

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, IndexBackend::Accelerated);
        assert!(outcome.results.iter().all(|r| r.backend == IndexBackend::Graph));
        assert_eq!(outcome.results.len(), 12);
    }

    #[test]
    fn truncated_dataset_fails_the_run_in_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        for mode in [IngestMode::Indexed, IngestMode::Streaming] {
            let mut config = config(dir.path(), mode, Some(EMULATED));
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&fs::read(&config.dataset_file).unwrap()).unwrap();
            let packed = encoder.finish().unwrap();
            let gz = dir.path().join("data.csv.gz");
            fs::write(&gz, &packed[..packed.len() / 2]).unwrap();
            config.dataset_file = gz;

            assert_eq!(run_benchmark(&config).unwrap_err().kind, ErrorKind::Io, "{:?}", mode);
        }
    }

    #[test]
    fn missing_query_file_is_a_startup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), IngestMode::Indexed, Some(EMULATED));
        config.query_file = dir.path().join("absent.txt");
        assert_eq!(run_benchmark(&config).unwrap_err().kind, ErrorKind::Io);
    }
}
