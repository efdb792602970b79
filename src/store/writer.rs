use std::collections::HashSet;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use crate::core::config::MergeStrategy;
use crate::core::error::{Error, Result};
use crate::core::stats::IndexStats;
use crate::core::types::{DocId, Document};
use crate::store::format::{default_selector, FormatSelector, VectorFormat};
use crate::store::merge::{policy_for, MergePolicy};
use crate::store::mvcc::{Snapshot, SnapshotController};
use crate::store::segment::Segment;

#[derive(Clone)]
pub struct WriterConfig {
    pub vector_field: String,
    pub dimension: usize,
    pub merge_strategy: MergeStrategy,
    pub format_selector: FormatSelector,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            vector_field: "vector".to_string(),
            dimension: 768,
            merge_strategy: MergeStrategy::NoMerge,
            format_selector: default_selector(),
        }
    }
}

/// Result of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPoint {
    pub version: u64,
    pub segment_count: usize,
    pub doc_count: usize,
}

#[derive(Default)]
struct PendingState {
    docs: Vec<Document>,
    ids: HashSet<DocId>,
}

/// Shared, internally synchronized writer.
///
/// Any number of threads may add concurrently; `commit` waits for in-flight
/// adds, seals the pending buffer into one segment and publishes a snapshot.
/// Documents are invisible to readers until committed.
pub struct IndexWriter {
    config: WriterConfig,
    format: VectorFormat,
    pending: Mutex<PendingState>,
    commit_lock: RwLock<()>,
    mvcc: Arc<SnapshotController>,
    merge_policy: Box<dyn MergePolicy>,
    closed: AtomicBool,
    commits: AtomicU64,
    last_commit: Mutex<Option<DateTime<Utc>>>,
    #[cfg(test)]
    failing_commits: AtomicUsize,
}

impl IndexWriter {
    pub fn open(config: WriterConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(Error::invalid_argument("vector dimension must be greater than zero"));
        }
        let format = (config.format_selector)(&config.vector_field);
        if config.dimension > format.max_dimensions {
            return Err(Error::invalid_argument(format!(
                "field '{}' accepts at most {} dimensions, configured {}",
                config.vector_field, format.max_dimensions, config.dimension
            )));
        }
        debug!(
            field = %config.vector_field,
            dimension = config.dimension,
            max_dimensions = format.max_dimensions,
            max_conn = format.max_connections,
            beam_width = format.beam_width,
            "Opened index writer"
        );

        Ok(IndexWriter {
            merge_policy: policy_for(config.merge_strategy),
            config,
            format,
            pending: Mutex::new(PendingState::default()),
            commit_lock: RwLock::new(()),
            mvcc: Arc::new(SnapshotController::new()),
            closed: AtomicBool::new(false),
            commits: AtomicU64::new(0),
            last_commit: Mutex::new(None),
            #[cfg(test)]
            failing_commits: AtomicUsize::new(0),
        })
    }

    /// Make the next `n` calls to [`IndexWriter::commit`] fail with an I/O
    /// error, leaving pending documents in place.
    #[cfg(test)]
    pub(crate) fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::Release);
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Result<()> {
        let failed = self
            .failing_commits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::new(crate::core::error::ErrorKind::Io, "segment flush failed".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_failure(&self) -> Result<()> {
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::invalid_state("index writer is closed"));
        }
        Ok(())
    }

    fn validate(&self, doc: &Document) -> Result<()> {
        if doc.vector_field != self.config.vector_field {
            return Err(Error::invalid_argument(format!(
                "document {} targets vector field '{}', writer indexes '{}'",
                doc.id.0, doc.vector_field, self.config.vector_field
            )));
        }
        if doc.vector.len() > self.format.max_dimensions {
            return Err(Error::invalid_argument(format!(
                "document {} has {} dimensions, field maximum is {}",
                doc.id.0,
                doc.vector.len(),
                self.format.max_dimensions
            )));
        }
        if doc.vector.len() != self.config.dimension {
            return Err(Error::invalid_argument(format!(
                "document {} has {} dimensions, field dimension is {}",
                doc.id.0,
                doc.vector.len(),
                self.config.dimension
            )));
        }
        Ok(())
    }

    pub fn add_document(&self, doc: Document) -> Result<()> {
        self.validate(&doc)?;

        // close() flips the flag under the exclusive lock, so an add that
        // passes this check is seen by the final commit.
        let _shared = self.commit_lock.read();
        self.ensure_open()?;
        let mut state = self.pending.lock();
        if !state.ids.insert(doc.id) {
            return Err(Error::invalid_argument(format!("duplicate document id {}", doc.id.0)));
        }
        state.docs.push(doc);
        Ok(())
    }

    /// Adds all documents or none of them.
    pub fn add_documents(&self, docs: Vec<Document>) -> Result<()> {
        for doc in &docs {
            self.validate(doc)?;
        }

        let _shared = self.commit_lock.read();
        self.ensure_open()?;
        let mut state = self.pending.lock();
        let mut batch_ids = HashSet::with_capacity(docs.len());
        for doc in &docs {
            if state.ids.contains(&doc.id) || !batch_ids.insert(doc.id) {
                return Err(Error::invalid_argument(format!("duplicate document id {}", doc.id.0)));
            }
        }
        state.ids.extend(batch_ids);
        state.docs.extend(docs);
        Ok(())
    }

    pub fn commit(&self) -> Result<CommitPoint> {
        let _exclusive = self.commit_lock.write();
        self.ensure_open()?;
        self.injected_failure()?;
        self.commit_locked()
    }

    fn commit_locked(&self) -> Result<CommitPoint> {
        let docs = mem::take(&mut self.pending.lock().docs);
        let current = self.mvcc.current();

        let snapshot = if docs.is_empty() {
            current
        } else {
            let mut segments = current.segments.clone();
            segments.push(Arc::new(Segment::new(docs)));
            self.mvcc.publish(segments)
        };

        self.commits.fetch_add(1, Ordering::Relaxed);
        *self.last_commit.lock() = Some(Utc::now());
        debug!(
            version = snapshot.version,
            segments = snapshot.segments.len(),
            docs = snapshot.doc_count,
            "Committed"
        );

        Ok(CommitPoint {
            version: snapshot.version,
            segment_count: snapshot.segments.len(),
            doc_count: snapshot.doc_count,
        })
    }

    /// Commit what is pending, apply the merge strategy and refuse further
    /// writes. Returns the final snapshot.
    pub fn close(&self) -> Result<Arc<Snapshot>> {
        let _exclusive = self.commit_lock.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(self.mvcc.current());
        }
        self.commit_locked()?;

        let current = self.mvcc.current();
        if !self.merge_policy.should_merge(&current.segments) {
            return Ok(current);
        }
        let merged = self.merge_policy.merge(&current.segments);
        debug!(
            before = current.segments.len(),
            after = merged.len(),
            strategy = %self.config.merge_strategy,
            "Merged segments on close"
        );
        Ok(self.mvcc.publish(merged))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Latest committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.mvcc.current()
    }

    pub fn stats(&self) -> IndexStats {
        let snapshot = self.mvcc.current();
        IndexStats {
            segment_count: snapshot.segments.len(),
            committed_documents: snapshot.doc_count,
            pending_documents: self.pending.lock().docs.len(),
            commits: self.commits.load(Ordering::Relaxed),
            snapshot_version: snapshot.version,
            last_commit_time: *self.last_commit.lock(),
            max_connections: self.format.max_connections,
            beam_width: self.format.beam_width,
        }
    }
}
