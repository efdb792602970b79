use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::types::{DocId, Document};

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable batch of committed documents
#[derive(Debug)]
pub struct Segment {
    pub id: SegmentId,
    pub docs: Vec<Document>,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub created_at: DateTime<Utc>,
    pub doc_count: u32,
    pub min_doc_id: DocId,
    pub max_doc_id: DocId,
    pub merged_from: usize,
}

impl Segment {
    pub fn new(docs: Vec<Document>) -> Self {
        Self::with_origin(docs, 1)
    }

    pub fn with_origin(docs: Vec<Document>, merged_from: usize) -> Self {
        let min_doc_id = docs.iter().map(|d| d.id).min().unwrap_or(DocId(0));
        let max_doc_id = docs.iter().map(|d| d.id).max().unwrap_or(DocId(0));
        Segment {
            id: SegmentId::new(),
            metadata: SegmentMetadata {
                created_at: Utc::now(),
                doc_count: docs.len() as u32,
                min_doc_id,
                max_doc_id,
                merged_from,
            },
            docs,
        }
    }

    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }
}
