use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use crate::core::config::BenchmarkConfig;
use crate::core::error::Result;
use crate::indexing::IndexingReport;
use crate::metrics::BenchmarkMetrics;
use crate::query::QueryResult;

pub const NEIGHBORS_FILE: &str = "neighbors.csv";
pub const SUMMARY_FILE: &str = "benchmark_results.json";

#[derive(Serialize)]
struct NeighborRow<'a> {
    codec: &'a str,
    #[serde(rename = "query-id")]
    query_id: usize,
    docs: String,
    scores: String,
    latency: f64,
    error: &'a str,
}

/// Per-query neighbours, sorted by codec then query id. Doc ids and scores
/// are written as JSON arrays.
pub fn write_neighbors(dir: &Path, results: &[QueryResult]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(NEIGHBORS_FILE);

    let mut ordered: Vec<&QueryResult> = results.iter().collect();
    ordered.sort_by(|a, b| {
        a.backend
            .codec()
            .cmp(b.backend.codec())
            .then(a.query_id.cmp(&b.query_id))
    });

    let mut writer = csv::Writer::from_path(&path)?;
    for result in ordered {
        writer.serialize(NeighborRow {
            codec: result.backend.codec(),
            query_id: result.query_id,
            docs: serde_json::to_string(&result.docs)?,
            scores: serde_json::to_string(&result.scores)?,
            latency: result.latency_ms,
            error: result.error.as_deref().unwrap_or(""),
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = results.len(), "Wrote per-query results");
    Ok(path)
}

/// Top-level shape of the JSON summary.
#[derive(Serialize)]
pub struct BenchmarkSummary<'a> {
    pub configuration: &'a BenchmarkConfig,
    pub metrics: &'a BenchmarkMetrics,
    pub indexing: &'a [IndexingReport],
    pub generated_at: DateTime<Utc>,
}

pub fn write_summary(dir: &Path, summary: &BenchmarkSummary) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    let mut out = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut out, summary)?;
    out.write_all(b"\n")?;
    out.flush()?;

    info!(path = %path.display(), "Wrote benchmark summary");
    Ok(path)
}
