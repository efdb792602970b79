use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::store::segment::Segment;

/// Point-in-time view of the committed segments
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub segments: Vec<Arc<Segment>>,
    pub timestamp: DateTime<Utc>,
    pub doc_count: usize,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            version: 0,
            segments: Vec::new(),
            timestamp: Utc::now(),
            doc_count: 0,
        }
    }
}

/// Publishes snapshots on commit; readers always see a complete commit.
pub struct SnapshotController {
    versions: RwLock<BTreeMap<u64, Arc<Snapshot>>>,
    current_version: AtomicU64,
    max_versions: usize,
}

impl SnapshotController {
    pub fn new() -> Self {
        SnapshotController {
            versions: RwLock::new(BTreeMap::new()),
            current_version: AtomicU64::new(0),
            max_versions: 16,
        }
    }

    pub fn publish(&self, segments: Vec<Arc<Segment>>) -> Arc<Snapshot> {
        let mut versions = self.versions.write();
        // Version 0 is the implicit empty snapshot.
        let version = self.current_version.fetch_add(1, Ordering::SeqCst) + 1;

        let doc_count = segments.iter().map(|s| s.doc_count()).sum();
        let snapshot = Arc::new(Snapshot {
            version,
            segments,
            timestamp: Utc::now(),
            doc_count,
        });
        versions.insert(version, snapshot.clone());

        while versions.len() > self.max_versions {
            versions.pop_first();
        }

        snapshot
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let versions = self.versions.read();
        versions
            .last_key_value()
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| Arc::new(Snapshot::default()))
    }
}

impl Default for SnapshotController {
    fn default() -> Self {
        Self::new()
    }
}
