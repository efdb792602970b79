use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use tracing::info;
use crate::core::error::{Error, Result};

/// Policy for consolidating committed segments when a writer closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStrategy {
    TrivialMerge,
    NonTrivialMerge,
    NoMerge,
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TRIVIAL_MERGE" => Ok(MergeStrategy::TrivialMerge),
            "NON_TRIVIAL_MERGE" => Ok(MergeStrategy::NonTrivialMerge),
            "NO_MERGE" => Ok(MergeStrategy::NoMerge),
            other => Err(Error::invalid_argument(format!(
                "unknown merge strategy '{}' (expected TRIVIAL_MERGE, NON_TRIVIAL_MERGE or NO_MERGE)",
                other
            ))),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MergeStrategy::TrivialMerge => "TRIVIAL_MERGE",
            MergeStrategy::NonTrivialMerge => "NON_TRIVIAL_MERGE",
            MergeStrategy::NoMerge => "NO_MERGE",
        };
        f.write_str(name)
    }
}

/// How rows reach the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Pre-parsed rows, worker i indexes row i as document i.
    Indexed,
    /// Producer/consumer over a bounded queue, batch add+commit.
    Streaming,
}

impl FromStr for IngestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" => Ok(IngestMode::Indexed),
            "streaming" => Ok(IngestMode::Streaming),
            other => Err(Error::invalid_argument(format!("unknown ingest mode '{}'", other))),
        }
    }
}

/// Graph index tuning, consumed opaquely by the graph backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTuning {
    pub max_connections: usize,  // 16 default (max 512)
    pub beam_width: usize,       // 100 default (max 3200)
    pub visited_limit: usize,
}

/// Accelerated index tuning, forwarded to the native binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratedTuning {
    pub intermediate_graph_degree: usize,  // 128 default
    pub graph_degree: usize,               // 64 default
    pub internal_top_k: usize,
    pub search_width: usize,
}

/// Benchmark configuration, built once and shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub dataset_file: PathBuf,
    pub vector_column_index: usize,
    pub vector_column_name: String,
    pub title_column_index: usize,
    pub num_docs: usize,
    pub vector_dimension: usize,
    pub query_file: PathBuf,
    pub commit_frequency: usize,
    pub top_k: usize,
    pub graph_writer_threads: usize,
    pub accelerated_writer_threads: usize,
    pub merge_strategy: MergeStrategy,
    pub query_threads: usize,
    pub graph: GraphTuning,
    pub accelerated: AcceleratedTuning,

    pub ingest_mode: IngestMode,
    pub batch_size: usize,            // streaming add+commit batch
    pub queue_capacity: usize,        // streaming producer queue bound
    pub store_titles: bool,
    pub native_library: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        BenchmarkConfig {
            dataset_file: PathBuf::from("dataset.csv"),
            vector_column_index: 3,
            vector_column_name: "title_vector".to_string(),
            title_column_index: 1,
            num_docs: 10_000,
            vector_dimension: 768,
            query_file: PathBuf::from("query.txt"),
            commit_frequency: 1000,
            top_k: 10,
            graph_writer_threads: cpus,
            accelerated_writer_threads: 1,
            merge_strategy: MergeStrategy::NoMerge,
            query_threads: cpus,
            graph: GraphTuning {
                max_connections: 16,
                beam_width: 100,
                visited_limit: 10_000,
            },
            accelerated: AcceleratedTuning {
                intermediate_graph_degree: 128,
                graph_degree: 64,
                internal_top_k: 32,
                search_width: 1,
            },
            ingest_mode: IngestMode::Indexed,
            batch_size: 500,
            queue_capacity: 1000,
            store_titles: false,
            native_library: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl BenchmarkConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("vector dimension", self.vector_dimension),
            ("commit frequency", self.commit_frequency),
            ("topK", self.top_k),
            ("graph writer threads", self.graph_writer_threads),
            ("accelerated writer threads", self.accelerated_writer_threads),
            ("query threads", self.query_threads),
            ("batch size", self.batch_size),
            ("queue capacity", self.queue_capacity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::invalid_argument(format!("{} must be greater than zero", name)));
            }
        }
        if self.vector_column_name.trim().is_empty() {
            return Err(Error::invalid_argument("vector column name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn log_arguments(&self) {
        info!(dataset = %self.dataset_file.display(), "Dataset file");
        info!(index = self.vector_column_index, name = %self.vector_column_name, "Vector field");
        info!(num_docs = self.num_docs, dimension = self.vector_dimension, "Documents to index");
        info!(query_file = %self.query_file.display(), top_k = self.top_k, "Queries");
        info!(commit_frequency = self.commit_frequency, mode = ?self.ingest_mode, "Ingestion");
        info!(
            graph_threads = self.graph_writer_threads,
            accelerated_threads = self.accelerated_writer_threads,
            query_threads = self.query_threads,
            "Threads"
        );
        info!(merge_strategy = %self.merge_strategy, "Merge strategy");
        info!(
            max_conn = self.graph.max_connections,
            beam_width = self.graph.beam_width,
            visited_limit = self.graph.visited_limit,
            "Graph parameters"
        );
        info!(
            intermediate_graph_degree = self.accelerated.intermediate_graph_degree,
            graph_degree = self.accelerated.graph_degree,
            itopk = self.accelerated.internal_top_k,
            search_width = self.accelerated.search_width,
            "Accelerated parameters"
        );
    }
}
