pub mod executor;

use serde::{Serialize, Deserialize};
use crate::backend::{IndexBackend, SearchTuning};

pub use executor::{QueryExecutor, QueryPhaseReport};

/// One query of the benchmark set.
#[derive(Debug, Clone)]
pub struct QueryJob {
    pub id: usize,
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub tuning: Option<SearchTuning>,
}

/// Outcome of a single query, best-first. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub backend: IndexBackend,
    pub query_id: usize,
    pub docs: Vec<i32>,
    pub scores: Vec<f32>,
    pub latency_ms: f64,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn failed(backend: IndexBackend, query_id: usize, latency_ms: f64, error: String) -> Self {
        QueryResult {
            backend,
            query_id,
            docs: Vec::new(),
            scores: Vec::new(),
            latency_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
