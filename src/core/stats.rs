use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Writer statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub segment_count: usize,
    pub committed_documents: usize,
    pub pending_documents: usize,
    pub commits: u64,
    pub snapshot_version: u64,
    pub last_commit_time: Option<DateTime<Utc>>,
    /// Graph parameters of the indexed field's vector format.
    pub max_connections: usize,
    pub beam_width: usize,
}
