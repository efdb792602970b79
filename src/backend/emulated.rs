use bytes::Bytes;
use parking_lot::RwLock;
use crate::backend::decoder::encode_top_docs;
use crate::backend::graph::euclidean_score;
use crate::backend::native::{AcceleratorBinding, BuildParams, IndexHandle, SearchParams};
use crate::backend::results::{ScoreDoc, TopKCollector};
use crate::core::error::{Error, Result};

struct EmulatedIndex {
    ids: Vec<i32>,
    vectors: Vec<f32>,
    dimension: usize,
}

/// In-process stand-in for the device library.
///
/// Exact search, answered in the device's buffer layout and, like the
/// device, worst-first.
pub struct EmulatedAccelerator {
    indexes: RwLock<Vec<EmulatedIndex>>,
}

impl EmulatedAccelerator {
    pub fn new() -> Self {
        EmulatedAccelerator {
            indexes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for EmulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceleratorBinding for EmulatedAccelerator {
    fn name(&self) -> &str {
        "emulated"
    }

    fn build_index(&self, ids: &[i32], vectors: &[f32], dimension: usize, _params: &BuildParams)
        -> Result<IndexHandle> {
        if dimension == 0 || vectors.len() != ids.len() * dimension {
            return Err(Error::invalid_argument(format!(
                "{} ids with dimension {} do not match {} vector values",
                ids.len(),
                dimension,
                vectors.len()
            )));
        }
        let mut indexes = self.indexes.write();
        indexes.push(EmulatedIndex {
            ids: ids.to_vec(),
            vectors: vectors.to_vec(),
            dimension,
        });
        Ok(IndexHandle((indexes.len() - 1) as i32))
    }

    fn query(&self, handle: IndexHandle, vector: &[f32], params: &SearchParams) -> Result<Bytes> {
        let indexes = self.indexes.read();
        let index = usize::try_from(handle.0)
            .ok()
            .and_then(|h| indexes.get(h))
            .ok_or_else(|| Error::native(format!("unknown index handle {}", handle.0)))?;
        if vector.len() != index.dimension {
            return Err(Error::invalid_argument(format!(
                "query has {} dimensions, index has {}",
                vector.len(),
                index.dimension
            )));
        }

        let mut collector = TopKCollector::new(params.top_k);
        for (row, &id) in index.vectors.chunks_exact(index.dimension).zip(&index.ids) {
            collector.collect(ScoreDoc::new(id, euclidean_score(vector, row)));
        }
        let worst_first = collector.into_top_docs().reversed();
        Ok(Bytes::from(encode_top_docs(&worst_first.score_docs)))
    }
}
