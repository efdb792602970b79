pub mod results;
pub mod decoder;
pub mod graph;
pub mod native;
pub mod emulated;
pub mod accelerated;

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::config::BenchmarkConfig;
use crate::core::error::Result;
use crate::backend::results::TopDocs;

/// The two competing vector index implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// CPU graph index; any number of writer threads.
    Graph,
    /// Device-accelerated index behind a native binding; one writer thread.
    Accelerated,
}

impl IndexBackend {
    pub const ALL: [IndexBackend; 2] = [IndexBackend::Accelerated, IndexBackend::Graph];

    pub fn name(&self) -> &'static str {
        match self {
            IndexBackend::Graph => "graph",
            IndexBackend::Accelerated => "accelerated",
        }
    }

    /// Codec tag written to the per-query report.
    pub fn codec(&self) -> &'static str {
        match self {
            IndexBackend::Graph => "graph_hnsw",
            IndexBackend::Accelerated => "accelerated_cagra",
        }
    }

    /// Writer threads for this backend. The accelerated backend is pinned to a
    /// single device session whatever the configuration says.
    pub fn writer_threads(&self, config: &BenchmarkConfig) -> usize {
        match self {
            IndexBackend::Graph => config.graph_writer_threads.max(1),
            IndexBackend::Accelerated => 1,
        }
    }

    /// Put ranked output in best-first order. Accelerated results arrive
    /// worst-first and are reversed for every query.
    pub fn best_first(&self, ranked: TopDocs) -> TopDocs {
        match self {
            IndexBackend::Graph => ranked,
            IndexBackend::Accelerated => ranked.reversed(),
        }
    }
}

impl fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accelerated search tuning carried by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTuning {
    pub internal_top_k: usize,
    pub search_width: usize,
}

/// k-nearest-neighbour query against one vector field.
#[derive(Debug, Clone)]
pub struct KnnQuery {
    pub field: String,
    pub vector: Vec<f32>,
    pub k: usize,
    pub tuning: Option<SearchTuning>,
}

impl KnnQuery {
    /// Graph queries carry only k; accelerated queries also carry the
    /// internal top-k and search width.
    pub fn for_backend(backend: IndexBackend, config: &BenchmarkConfig, vector: Vec<f32>) -> Self {
        let tuning = match backend {
            IndexBackend::Graph => None,
            IndexBackend::Accelerated => Some(SearchTuning {
                internal_top_k: config.accelerated.internal_top_k,
                search_width: config.accelerated.search_width,
            }),
        };
        KnnQuery {
            field: config.vector_column_name.clone(),
            vector,
            k: config.top_k,
            tuning,
        }
    }
}

/// Read-only searcher over a frozen snapshot, shared by all query threads.
pub trait VectorSearcher: Send + Sync {
    fn backend(&self) -> IndexBackend;

    /// Raw ranked output in the backend's native order.
    fn search(&self, query: &KnnQuery) -> Result<TopDocs>;
}
