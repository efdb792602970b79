//! Index the same vector dataset into a CPU graph backend and a
//! device-accelerated backend, run a fixed query set against both, and write
//! per-query neighbours plus a JSON summary.
//!
//! ```bash
//! knnduel wiki.csv.zip 3 title_vector 100000 768 queries.txt 1000 10 \
//!     8 1 NO_MERGE 8 16 100 10000 128 64 32 1 --native-lib emulated
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use knnduel::core::config::{AcceleratedTuning, BenchmarkConfig, GraphTuning};
use knnduel::core::error::Result;
use knnduel::report::{write_neighbors, write_summary, BenchmarkSummary};
use knnduel::runner::run_benchmark;

#[derive(Parser, Debug)]
#[command(name = "knnduel")]
#[command(version, about = "Graph vs accelerated vector index benchmark")]
struct Cli {
    /// CSV dataset, optionally .zip, .gz or .bz2 compressed
    dataset_file: PathBuf,
    /// 0-based column holding the vector literal
    vector_column_index: usize,
    /// Vector field name
    vector_column_name: String,
    /// Maximum number of data rows to index
    num_docs: usize,
    /// Every vector is truncated or zero-padded to this dimension
    vector_dimension: usize,
    /// One query vector per line
    query_file: PathBuf,
    commit_frequency: usize,
    top_k: usize,
    /// Writer threads for the graph backend
    cpu_backend_threads: usize,
    /// Accepted for compatibility; the accelerated backend always uses one writer
    accelerated_writer_threads: usize,
    /// TRIVIAL_MERGE, NON_TRIVIAL_MERGE or NO_MERGE
    merge_strategy: String,
    query_threads: usize,
    hnsw_max_conn: usize,
    hnsw_beam_width: usize,
    hnsw_visited_limit: usize,
    cagra_intermediate_graph_degree: usize,
    cagra_graph_degree: usize,
    cagra_itopk: usize,
    cagra_search_width: usize,

    /// Ingestion mode: indexed or streaming
    #[arg(long, default_value = "indexed")]
    mode: String,

    /// Streaming add+commit batch size
    #[arg(long, default_value = "500")]
    batch_size: usize,

    /// Streaming queue capacity
    #[arg(long, default_value = "1000")]
    queue_capacity: usize,

    /// 0-based title column
    #[arg(long, default_value = "1")]
    title_column: usize,

    /// Native accelerator library path, or "emulated". Falls back to
    /// KNNDUEL_NATIVE_LIB.
    #[arg(long)]
    native_lib: Option<String>,

    /// Directory for neighbors.csv and benchmark_results.json
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Keep row titles as a stored field
    #[arg(long, default_value = "false")]
    store_titles: bool,
}

impl Cli {
    fn into_config(self) -> Result<BenchmarkConfig> {
        let config = BenchmarkConfig {
            dataset_file: self.dataset_file,
            vector_column_index: self.vector_column_index,
            vector_column_name: self.vector_column_name,
            title_column_index: self.title_column,
            num_docs: self.num_docs,
            vector_dimension: self.vector_dimension,
            query_file: self.query_file,
            commit_frequency: self.commit_frequency,
            top_k: self.top_k,
            graph_writer_threads: self.cpu_backend_threads,
            accelerated_writer_threads: self.accelerated_writer_threads,
            merge_strategy: self.merge_strategy.parse()?,
            query_threads: self.query_threads,
            graph: GraphTuning {
                max_connections: self.hnsw_max_conn,
                beam_width: self.hnsw_beam_width,
                visited_limit: self.hnsw_visited_limit,
            },
            accelerated: AcceleratedTuning {
                intermediate_graph_degree: self.cagra_intermediate_graph_degree,
                graph_degree: self.cagra_graph_degree,
                internal_top_k: self.cagra_itopk,
                search_width: self.cagra_search_width,
            },
            ingest_mode: self.mode.parse()?,
            batch_size: self.batch_size,
            queue_capacity: self.queue_capacity,
            store_titles: self.store_titles,
            native_library: self.native_lib,
            output_dir: self.output_dir,
        };
        config.validate()?;
        Ok(config)
    }
}

fn run(config: &BenchmarkConfig) -> Result<()> {
    let outcome = run_benchmark(config)?;
    for (backend, reason) in &outcome.skipped {
        warn!(backend = %backend, reason = %reason, "Backend skipped");
    }

    write_neighbors(&config.output_dir, &outcome.results)?;
    write_summary(
        &config.output_dir,
        &BenchmarkSummary {
            configuration: config,
            metrics: &outcome.metrics,
            indexing: &outcome.indexing,
            generated_at: Utc::now(),
        },
    )?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid arguments");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => {
            info!("Benchmark complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Benchmark failed");
            ExitCode::FAILURE
        }
    }
}
