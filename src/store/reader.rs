use std::collections::HashMap;
use std::sync::Arc;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, FieldValue};
use crate::store::mvcc::Snapshot;
use crate::store::segment::Segment;

/// Vectors of a snapshot flattened for a native build call.
#[derive(Debug, Clone)]
pub struct VectorExport {
    pub ids: Vec<i32>,
    /// Row-major, `ids.len() * dimension` values.
    pub vectors: Vec<f32>,
    pub dimension: usize,
}

impl VectorExport {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Immutable reader over one snapshot. Safe to share across query threads
/// without locking.
pub struct IndexReader {
    snapshot: Arc<Snapshot>,
    locations: HashMap<DocId, (usize, usize)>,
}

impl IndexReader {
    pub fn open(snapshot: Arc<Snapshot>) -> Self {
        let mut locations = HashMap::with_capacity(snapshot.doc_count);
        for (leaf, segment) in snapshot.segments.iter().enumerate() {
            for (offset, doc) in segment.docs.iter().enumerate() {
                locations.insert(doc.id, (leaf, offset));
            }
        }
        IndexReader { snapshot, locations }
    }

    pub fn num_docs(&self) -> usize {
        self.snapshot.doc_count
    }

    /// One past the largest document id. Equals `num_docs` when ids are
    /// dense row ordinals.
    pub fn max_doc(&self) -> usize {
        self.locations.keys().map(|id| id.0 as usize + 1).max().unwrap_or(0)
    }

    pub fn stored_field(&self, id: DocId, name: &str) -> Option<&FieldValue> {
        self.document(id).and_then(|doc| doc.fields.get(name))
    }

    pub fn leaves(&self) -> &[Arc<Segment>] {
        &self.snapshot.segments
    }

    /// All documents in leaf order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.snapshot.segments.iter().flat_map(|s| s.docs.iter())
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.locations
            .get(&id)
            .map(|&(leaf, offset)| &self.snapshot.segments[leaf].docs[offset])
    }

    pub fn export_vectors(&self, field: &str) -> Result<VectorExport> {
        let mut ids = Vec::with_capacity(self.num_docs());
        let mut vectors = Vec::new();
        let mut dimension = None;

        for doc in self.documents().filter(|d| d.vector_field == field) {
            let dim = *dimension.get_or_insert(doc.vector.len());
            if doc.vector.len() != dim {
                return Err(Error::invalid_state(format!(
                    "document {} has {} dimensions, expected {}",
                    doc.id.0,
                    doc.vector.len(),
                    dim
                )));
            }
            if vectors.capacity() == 0 {
                vectors.reserve(self.num_docs() * dim);
            }
            ids.push(doc.id.as_native()?);
            vectors.extend_from_slice(&doc.vector);
        }

        let dimension = dimension
            .ok_or_else(|| Error::invalid_state(format!("no vectors indexed for field '{}'", field)))?;
        Ok(VectorExport { ids, vectors, dimension })
    }
}
