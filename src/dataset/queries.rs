use std::fs;
use std::path::Path;
use tracing::{info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::VectorRecord;
use crate::dataset::parser::parse_normalized;

/// Query vectors loaded from a newline-delimited file.
#[derive(Debug, Clone)]
pub struct QuerySet {
    /// Query id of each vector: its position among the non-blank lines of
    /// the file, so ids survive skipped lines.
    pub ids: Vec<usize>,
    pub vectors: Vec<VectorRecord>,
    pub malformed: usize,
}

impl QuerySet {
    /// Vectors numbered 0..n.
    pub fn from_vectors(vectors: Vec<VectorRecord>) -> Self {
        QuerySet { ids: (0..vectors.len()).collect(), vectors, malformed: 0 }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// One vector literal per line, each normalized to `dimension`. Blank lines
/// are ignored. Malformed lines are skipped but still consume an id.
pub fn parse_queries(text: &str, dimension: usize) -> QuerySet {
    let mut ids = Vec::new();
    let mut vectors = Vec::new();
    let mut malformed = 0;
    let lines = text.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());
    for (id, (line_no, line)) in lines.enumerate() {
        match parse_normalized(line, dimension) {
            Ok(v) => {
                ids.push(id);
                vectors.push(v);
            }
            Err(e) => {
                malformed += 1;
                warn!(line = line_no + 1, error = %e, "Skipping malformed query");
            }
        }
    }
    QuerySet { ids, vectors, malformed }
}

pub fn load_queries(path: &Path, dimension: usize) -> Result<QuerySet> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::new(ErrorKind::Io, format!("cannot read query file {}: {}", path.display(), e))
    })?;
    let queries = parse_queries(&text, dimension);
    info!(queries = queries.len(), malformed = queries.malformed, "Loaded query set");
    Ok(queries)
}
