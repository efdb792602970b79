use std::collections::BinaryHeap;
use std::cmp::Ordering;

/// Ranked hit: document id and similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDoc {
    pub doc: i32,
    pub score: f32,
}

impl ScoreDoc {
    pub fn new(doc: i32, score: f32) -> Self {
        ScoreDoc { doc, score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalHitsRelation {
    EqualTo,
    GreaterThanOrEqualTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalHits {
    pub value: usize,
    pub relation: TotalHitsRelation,
}

impl TotalHits {
    pub fn exactly(value: usize) -> Self {
        TotalHits { value, relation: TotalHitsRelation::EqualTo }
    }
}

/// Search results container
#[derive(Debug, Clone, PartialEq)]
pub struct TopDocs {
    pub total_hits: TotalHits,
    pub score_docs: Vec<ScoreDoc>,
}

impl TopDocs {
    pub fn new(score_docs: Vec<ScoreDoc>) -> Self {
        TopDocs {
            total_hits: TotalHits::exactly(score_docs.len()),
            score_docs,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.score_docs.reverse();
        self
    }

    pub fn doc_ids(&self) -> Vec<i32> {
        self.score_docs.iter().map(|h| h.doc).collect()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.score_docs.iter().map(|h| h.score).collect()
    }
}

// Min-heap entry: the worst retained hit sits on top.
#[derive(Debug, Clone, Copy)]
struct HeapEntry(ScoreDoc);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order so the heap top is the lowest score, ties broken
        // towards the larger doc id being evicted first.
        other.0.score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.doc.cmp(&other.0.doc))
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<HeapEntry>,
    k: usize,
    total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, hit: ScoreDoc) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }
        self.heap.push(HeapEntry(hit));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn merge(&mut self, other: TopKCollector) {
        self.total_collected += other.total_collected;
        for entry in other.heap {
            self.heap.push(entry);
            if self.heap.len() > self.k {
                self.heap.pop();
            }
        }
    }

    pub fn total_collected(&self) -> usize {
        self.total_collected
    }

    /// Best-first: descending score, ascending doc id on ties.
    pub fn into_top_docs(self) -> TopDocs {
        let mut hits: Vec<ScoreDoc> = self.heap.into_iter().map(|e| e.0).collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc.cmp(&b.doc)));
        TopDocs::new(hits)
    }
}
