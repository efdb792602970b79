use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use crate::core::config::BenchmarkConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, VectorRecord};
use crate::dataset::parser::parse_normalized;
use crate::dataset::source::open_dataset;

/// One accepted data row.
#[derive(Debug, Clone)]
pub struct RowRecord {
    /// 0-based ordinal among accepted rows; becomes the document id.
    pub ordinal: DocId,
    pub title: String,
    pub vector: VectorRecord,
}

/// Counters shared between an ingestor and whoever reports on it.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub rows_read: AtomicUsize,
    pub accepted: AtomicUsize,
    pub malformed: AtomicUsize,
    /// Set when the source failed mid-read. Rows yielded so far are then
    /// only a prefix of the dataset.
    read_error: Mutex<Option<Error>>,
}

impl IngestStats {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> usize {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn take_error(&self) -> Option<Error> {
        self.read_error.lock().take()
    }
}

/// Lazy sequence of `(title, vector)` rows from a CSV dataset.
///
/// The first record is a header and never counts. Malformed rows are skipped
/// and counted. Iteration stops once `num_docs` rows have been accepted, so the
/// number of yielded rows is `min(num_docs, well-formed data rows)`.
/// An I/O failure ends iteration and is kept in [`IngestStats::take_error`].
/// Restartable only by opening the source again.
pub struct DatasetIngestor<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    vector_column: usize,
    title_column: usize,
    dimension: usize,
    limit: usize,
    stats: Arc<IngestStats>,
    done: bool,
}

impl DatasetIngestor<Box<dyn Read + Send>> {
    pub fn open(config: &BenchmarkConfig) -> Result<Self> {
        let reader = open_dataset(&config.dataset_file)?;
        Ok(Self::from_reader(reader, config))
    }
}

impl<R: Read> DatasetIngestor<R> {
    pub fn from_reader(reader: R, config: &BenchmarkConfig) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        DatasetIngestor {
            records,
            vector_column: config.vector_column_index,
            title_column: config.title_column_index,
            dimension: config.vector_dimension,
            limit: config.num_docs,
            stats: Arc::new(IngestStats::default()),
            done: false,
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    fn accept(&self, record: &csv::StringRecord) -> Result<(String, VectorRecord)> {
        let raw_vector = record.get(self.vector_column).ok_or_else(|| {
            crate::core::error::Error::parse(format!(
                "row has {} columns, vector column is {}",
                record.len(),
                self.vector_column
            ))
        })?;
        let title = record.get(self.title_column).ok_or_else(|| {
            crate::core::error::Error::parse(format!(
                "row has {} columns, title column is {}",
                record.len(),
                self.title_column
            ))
        })?;
        let vector = parse_normalized(raw_vector, self.dimension)?;
        Ok((title.to_string(), vector))
    }
}

impl<R: Read> Iterator for DatasetIngestor<R> {
    type Item = RowRecord;

    fn next(&mut self) -> Option<RowRecord> {
        while !self.done {
            if self.stats.accepted() >= self.limit {
                self.done = true;
                break;
            }

            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    if e.is_io_error() {
                        let rows = self.stats.rows_read.load(Ordering::Relaxed);
                        error!(error = %e, rows, "Dataset read failed, stopping ingestion");
                        *self.stats.read_error.lock() = Some(Error::new(
                            ErrorKind::Io,
                            format!("dataset read failed after {} rows: {}", rows, e),
                        ));
                        self.done = true;
                        break;
                    }
                    self.stats.rows_read.fetch_add(1, Ordering::Relaxed);
                    self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %e, "Skipping undecodable row");
                    continue;
                }
                None => {
                    self.done = true;
                    break;
                }
            };
            self.stats.rows_read.fetch_add(1, Ordering::Relaxed);

            match self.accept(&record) {
                Ok((title, vector)) => {
                    let ordinal = self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                    if (ordinal + 1) % 10_000 == 0 {
                        debug!(rows = ordinal + 1, "Rows parsed");
                    }
                    return Some(RowRecord {
                        ordinal: DocId(ordinal as u32),
                        title,
                        vector,
                    });
                }
                Err(e) => {
                    debug_assert_eq!(e.kind, ErrorKind::Parse);
                    let skipped = self.stats.malformed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(error = %e, skipped, "Skipping malformed row");
                }
            }
        }
        None
    }
}

/// Whole dataset parsed up front, as used by the indexed-worker benchmark.
#[derive(Debug)]
pub struct LoadedDataset {
    pub records: Vec<RowRecord>,
    pub malformed: usize,
    pub parse_time: Duration,
}

pub fn load_dataset(config: &BenchmarkConfig) -> Result<LoadedDataset> {
    info!(path = %config.dataset_file.display(), "Parsing dataset");
    let start = Instant::now();
    let ingestor = DatasetIngestor::open(config)?;
    let stats = ingestor.stats();
    let records: Vec<RowRecord> = ingestor.collect();
    let parse_time = start.elapsed();
    if let Some(e) = stats.take_error() {
        return Err(e);
    }

    let malformed = stats.malformed();
    if malformed > 0 {
        warn!(malformed, "Skipped malformed dataset rows");
    }
    info!(
        rows = records.len(),
        took_ms = parse_time.as_millis() as u64,
        "Dataset parsed"
    );
    Ok(LoadedDataset { records, malformed, parse_time })
}
