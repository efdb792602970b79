use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use crate::backend::decoder::decode_top_docs;
use crate::backend::native::{AcceleratorBinding, BuildParams, IndexHandle, SearchParams};
use crate::backend::results::TopDocs;
use crate::backend::{IndexBackend, KnnQuery, VectorSearcher};
use crate::core::config::AcceleratedTuning;
use crate::core::error::{Error, Result};
use crate::store::reader::IndexReader;

/// Searcher that copies a snapshot's vectors into the native index once and
/// answers queries through the binding.
pub struct AcceleratedSearcher {
    binding: Arc<dyn AcceleratorBinding>,
    handle: IndexHandle,
    field: String,
    dimension: usize,
    num_vectors: usize,
    defaults: AcceleratedTuning,
}

impl AcceleratedSearcher {
    pub fn new(
        reader: &IndexReader,
        field: &str,
        binding: Arc<dyn AcceleratorBinding>,
        tuning: AcceleratedTuning,
    ) -> Result<Self> {
        let start = Instant::now();
        let export = reader.export_vectors(field)?;
        info!(
            vectors = export.len(),
            took_ms = start.elapsed().as_millis() as u64,
            "Copied snapshot vectors for native build"
        );

        let start = Instant::now();
        let params = BuildParams {
            intermediate_graph_degree: tuning.intermediate_graph_degree,
            graph_degree: tuning.graph_degree,
        };
        let handle = binding.build_index(&export.ids, &export.vectors, export.dimension, &params)?;
        info!(
            binding = binding.name(),
            took_ms = start.elapsed().as_millis() as u64,
            "Built accelerated index"
        );

        Ok(AcceleratedSearcher {
            binding,
            handle,
            field: field.to_string(),
            dimension: export.dimension,
            num_vectors: export.len(),
            defaults: tuning,
        })
    }

    pub fn num_vectors(&self) -> usize {
        self.num_vectors
    }
}

impl VectorSearcher for AcceleratedSearcher {
    fn backend(&self) -> IndexBackend {
        IndexBackend::Accelerated
    }

    fn search(&self, query: &KnnQuery) -> Result<TopDocs> {
        if query.field != self.field {
            return Err(Error::invalid_argument(format!(
                "query targets field '{}', accelerated index covers '{}'",
                query.field, self.field
            )));
        }
        if query.vector.len() != self.dimension {
            return Err(Error::invalid_argument(format!(
                "query has {} dimensions, index has {}",
                query.vector.len(),
                self.dimension
            )));
        }

        let (internal_top_k, search_width) = match query.tuning {
            Some(t) => (t.internal_top_k, t.search_width),
            None => (self.defaults.internal_top_k, self.defaults.search_width),
        };
        let params = SearchParams {
            top_k: query.k,
            internal_top_k,
            search_width,
        };
        let buffer = self.binding.query(self.handle, &query.vector, &params)?;
        decode_top_docs(&buffer)
    }
}
