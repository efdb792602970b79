use std::sync::Arc;
use rayon::prelude::*;
use tracing::debug;
use crate::backend::results::{ScoreDoc, TopDocs, TopKCollector};
use crate::backend::{IndexBackend, KnnQuery, VectorSearcher};
use crate::core::config::GraphTuning;
use crate::core::error::{Error, Result};
use crate::store::reader::IndexReader;

/// Squared L2 distance, unrolled by four.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            let d = ca[lane] - cb[lane];
            acc[lane] += d * d;
        }
    }
    acc[0] + acc[1] + acc[2] + acc[3] + tail
}

/// Euclidean similarity, higher is closer.
pub fn euclidean_score(a: &[f32], b: &[f32]) -> f32 {
    1.0 / (1.0 + squared_euclidean(a, b))
}

/// CPU searcher for the graph backend.
///
/// Scores every leaf in parallel and keeps the best k; results come back
/// best-first. The graph tuning is only logged.
pub struct GraphSearcher {
    reader: Arc<IndexReader>,
    field: String,
    leaf_ids: Vec<Vec<i32>>,
}

impl GraphSearcher {
    pub fn new(reader: Arc<IndexReader>, field: &str, tuning: GraphTuning) -> Result<Self> {
        let leaf_ids = reader
            .leaves()
            .iter()
            .map(|leaf| leaf.docs.iter().map(|d| d.id.as_native()).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        debug!(
            docs = reader.num_docs(),
            leaves = leaf_ids.len(),
            max_conn = tuning.max_connections,
            beam_width = tuning.beam_width,
            visited_limit = tuning.visited_limit,
            "Opened graph searcher"
        );
        Ok(GraphSearcher {
            reader,
            field: field.to_string(),
            leaf_ids,
        })
    }
}

impl VectorSearcher for GraphSearcher {
    fn backend(&self) -> IndexBackend {
        IndexBackend::Graph
    }

    fn search(&self, query: &KnnQuery) -> Result<TopDocs> {
        if query.field != self.field {
            return Err(Error::invalid_argument(format!(
                "query targets field '{}', searcher covers '{}'",
                query.field, self.field
            )));
        }

        let collector = self
            .reader
            .leaves()
            .par_iter()
            .zip(self.leaf_ids.par_iter())
            .map(|(leaf, ids)| {
                let mut local = TopKCollector::new(query.k);
                for (doc, &id) in leaf.docs.iter().zip(ids) {
                    if doc.vector.len() != query.vector.len() {
                        continue;
                    }
                    local.collect(ScoreDoc::new(id, euclidean_score(&query.vector, &doc.vector)));
                }
                local
            })
            .reduce(
                || TopKCollector::new(query.k),
                |mut a, b| {
                    a.merge(b);
                    a
                },
            );

        Ok(collector.into_top_docs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, Document, VectorRecord};
    use crate::store::mvcc::SnapshotController;
    use crate::store::segment::Segment;

    fn searcher(points: &[(u32, [f32; 2])], per_leaf: usize) -> GraphSearcher {
        let mvcc = SnapshotController::new();
        let segments = points
            .chunks(per_leaf)
            .map(|chunk| {
                Arc::new(Segment::new(
                    chunk
                        .iter()
                        .map(|(id, v)| Document::new(DocId(*id), "emb", VectorRecord(v.to_vec())))
                        .collect(),
                ))
            })
            .collect();
        let reader = Arc::new(IndexReader::open(mvcc.publish(segments)));
        let tuning = GraphTuning { max_connections: 16, beam_width: 100, visited_limit: 1000 };
        GraphSearcher::new(reader, "emb", tuning).unwrap()
    }

    fn query(v: [f32; 2], k: usize) -> KnnQuery {
        KnnQuery { field: "emb".into(), vector: v.to_vec(), k, tuning: None }
    }

    #[test]
    fn distance_matches_naive_sum() {
        let a: Vec<f32> = (0..11).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..11).map(|i| (i * 2) as f32).collect();
        let naive: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
        assert_eq!(squared_euclidean(&a, &b), naive);
    }

    #[test]
    fn returns_nearest_best_first_across_leaves() {
        let s = searcher(&[(0, [0.0, 0.0]), (1, [5.0, 5.0]), (2, [1.0, 0.0]), (3, [9.0, 9.0])], 2);
        let top = s.search(&query([0.9, 0.0], 2)).unwrap();
        assert_eq!(top.doc_ids(), vec![2, 0]);
        assert!(top.score_docs[0].score > top.score_docs[1].score);
        assert_eq!(top.total_hits.value, 2);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let s = searcher(&[(0, [0.0, 0.0]), (1, [1.0, 1.0])], 1);
        assert_eq!(s.search(&query([0.0, 0.0], 10)).unwrap().score_docs.len(), 2);
    }

    #[test]
    fn wrong_field_is_an_error() {
        let s = searcher(&[(0, [0.0, 0.0])], 1);
        let mut q = query([0.0, 0.0], 1);
        q.field = "other".into();
        assert!(s.search(&q).is_err());
    }
}
