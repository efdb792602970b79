use std::sync::Arc;
use crate::core::config::MergeStrategy;
use crate::store::segment::Segment;

/// Policy for deciding when and how to merge segments
pub trait MergePolicy: Send + Sync {
    /// Check if segments should be merged
    fn should_merge(&self, segments: &[Arc<Segment>]) -> bool;

    /// Produce the segment list that replaces `segments`
    fn merge(&self, segments: &[Arc<Segment>]) -> Vec<Arc<Segment>>;
}

pub fn policy_for(strategy: MergeStrategy) -> Box<dyn MergePolicy> {
    match strategy {
        MergeStrategy::NoMerge => Box::new(NoMergePolicy),
        MergeStrategy::TrivialMerge => Box::new(ConcatMergePolicy { sort_by_id: false }),
        MergeStrategy::NonTrivialMerge => Box::new(ConcatMergePolicy { sort_by_id: true }),
    }
}

/// Keeps segments exactly as committed.
pub struct NoMergePolicy;

impl MergePolicy for NoMergePolicy {
    fn should_merge(&self, _segments: &[Arc<Segment>]) -> bool {
        false
    }

    fn merge(&self, segments: &[Arc<Segment>]) -> Vec<Arc<Segment>> {
        segments.to_vec()
    }
}

/// Collapses all segments into one. The trivial variant keeps segment order,
/// the non-trivial one also re-sorts documents by id.
pub struct ConcatMergePolicy {
    pub sort_by_id: bool,
}

impl MergePolicy for ConcatMergePolicy {
    fn should_merge(&self, segments: &[Arc<Segment>]) -> bool {
        segments.len() > 1 || (self.sort_by_id && !segments.is_empty())
    }

    fn merge(&self, segments: &[Arc<Segment>]) -> Vec<Arc<Segment>> {
        if !self.should_merge(segments) {
            return segments.to_vec();
        }

        let total: usize = segments.iter().map(|s| s.doc_count()).sum();
        let mut docs = Vec::with_capacity(total);
        for segment in segments {
            docs.extend(segment.docs.iter().cloned());
        }
        if self.sort_by_id {
            docs.sort_by_key(|d| d.id);
        }

        vec![Arc::new(Segment::with_origin(docs, segments.len()))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, Document, VectorRecord};

    fn segment(ids: &[u32]) -> Arc<Segment> {
        Arc::new(Segment::new(
            ids.iter()
                .map(|&i| Document::new(DocId(i), "v", VectorRecord(vec![0.0])))
                .collect(),
        ))
    }

    fn ids(segment: &Segment) -> Vec<u32> {
        segment.docs.iter().map(|d| d.id.0).collect()
    }

    #[test]
    fn no_merge_keeps_segments() {
        let segments = vec![segment(&[3, 4]), segment(&[0])];
        let merged = policy_for(MergeStrategy::NoMerge).merge(&segments);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, segments[0].id);
    }

    #[test]
    fn trivial_merge_concatenates_in_segment_order() {
        let merged = policy_for(MergeStrategy::TrivialMerge).merge(&[segment(&[3, 4]), segment(&[0])]);
        assert_eq!(merged.len(), 1);
        assert_eq!(ids(&merged[0]), vec![3, 4, 0]);
        assert_eq!(merged[0].metadata.merged_from, 2);
    }

    #[test]
    fn non_trivial_merge_sorts_by_id() {
        let merged =
            policy_for(MergeStrategy::NonTrivialMerge).merge(&[segment(&[3, 4]), segment(&[0])]);
        assert_eq!(ids(&merged[0]), vec![0, 3, 4]);
    }

    #[test]
    fn merging_nothing_yields_nothing() {
        assert!(policy_for(MergeStrategy::TrivialMerge).merge(&[]).is_empty());
        assert!(policy_for(MergeStrategy::NonTrivialMerge).merge(&[]).is_empty());
    }
}
