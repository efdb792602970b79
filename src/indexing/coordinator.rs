use std::io::Read;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use crossbeam::channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::{debug, error, info};
use crate::backend::IndexBackend;
use crate::core::config::{BenchmarkConfig, IngestMode};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, FieldValue};
use crate::dataset::ingestor::{DatasetIngestor, LoadedDataset, RowRecord};
use crate::indexing::gate::CommitGate;
use crate::store::writer::IndexWriter;

/// Outcome of one backend's ingest phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingReport {
    pub backend: IndexBackend,
    pub mode: IngestMode,
    pub docs_added: usize,
    pub commits: usize,
    pub commit_failures: usize,
    pub add_failures: usize,
    pub malformed_rows: usize,
    pub elapsed_ms: f64,
}

enum Message {
    Row(RowRecord),
    Eof,
}

#[derive(Default)]
struct Counters {
    added: AtomicUsize,
    commits: AtomicUsize,
    commit_failures: AtomicUsize,
    add_failures: AtomicUsize,
}

/// Drives one backend's writer through the ingest phase.
///
/// Add and commit failures are logged and counted, never propagated to
/// sibling workers. Both modes end by closing the writer.
pub struct IndexingCoordinator<'a> {
    config: &'a BenchmarkConfig,
    backend: IndexBackend,
    writer: Arc<IndexWriter>,
    gate: CommitGate,
    counters: Counters,
}

impl<'a> IndexingCoordinator<'a> {
    pub fn new(config: &'a BenchmarkConfig, backend: IndexBackend, writer: Arc<IndexWriter>) -> Self {
        IndexingCoordinator {
            config,
            backend,
            writer,
            gate: CommitGate::new(),
            counters: Counters::default(),
        }
    }

    pub fn gate(&self) -> &CommitGate {
        &self.gate
    }

    fn threads(&self) -> usize {
        self.backend.writer_threads(self.config)
    }

    fn document(&self, row: &RowRecord) -> Document {
        let doc = Document::new(row.ordinal, &self.config.vector_column_name, row.vector.clone());
        if self.config.store_titles {
            doc.with_field("title", FieldValue::Text(row.title.clone()))
        } else {
            doc
        }
    }

    fn commit(&self) {
        match self.writer.commit() {
            Ok(point) => {
                self.counters.commits.fetch_add(1, Ordering::Relaxed);
                debug!(backend = %self.backend, version = point.version, docs = point.doc_count, "Commit");
            }
            Err(e) => {
                self.counters.commit_failures.fetch_add(1, Ordering::Relaxed);
                error!(backend = %self.backend, error = %e, "Commit failed");
            }
        }
    }

    fn close(&self) {
        if let Err(e) = self.writer.close() {
            self.counters.commit_failures.fetch_add(1, Ordering::Relaxed);
            error!(backend = %self.backend, error = %e, "Closing writer failed");
        }
    }

    fn report(&self, mode: IngestMode, malformed_rows: usize, started: Instant) -> IndexingReport {
        let report = IndexingReport {
            backend: self.backend,
            mode,
            docs_added: self.counters.added.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
            commit_failures: self.counters.commit_failures.load(Ordering::Relaxed),
            add_failures: self.counters.add_failures.load(Ordering::Relaxed),
            malformed_rows,
            elapsed_ms: started.elapsed().as_nanos() as f64 / 1e6,
        };
        info!(
            backend = %report.backend,
            mode = ?report.mode,
            docs = report.docs_added,
            commits = report.commits,
            failures = report.add_failures + report.commit_failures,
            took_ms = report.elapsed_ms,
            "Indexing finished"
        );
        report
    }

    /// Indexed-worker mode: row i becomes document i on a fixed pool.
    ///
    /// Adds share the gate. The worker whose add brings the running count to a
    /// multiple of the commit frequency commits with adds excluded. A final
    /// commit publishes the remainder before the writer is closed.
    pub fn index_loaded(&self, dataset: &LoadedDataset) -> Result<IndexingReport> {
        let threads = self.threads();
        let frequency = self.config.commit_frequency.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name({
                let backend = self.backend;
                move |i| format!("{}-writer-{}", backend, i)
            })
            .build()?;
        info!(backend = %self.backend, threads, docs = dataset.records.len(), "Indexing with worker pool");

        let started = Instant::now();
        pool.install(|| {
            dataset.records.par_iter().for_each(|row| {
                let added = {
                    let _shared = self.gate.add_window();
                    self.writer.add_document(self.document(row))
                };
                match added {
                    Ok(()) => {
                        let count = self.counters.added.fetch_add(1, Ordering::AcqRel) + 1;
                        if count % frequency == 0 {
                            self.gate.exclusive(|| self.commit());
                        }
                    }
                    Err(e) => {
                        self.counters.add_failures.fetch_add(1, Ordering::Relaxed);
                        error!(backend = %self.backend, doc = row.ordinal.0, error = %e, "Add failed");
                    }
                }
            });
        });

        self.gate.exclusive(|| self.commit());
        self.close();
        Ok(self.report(IngestMode::Indexed, dataset.malformed, started))
    }

    /// Streaming mode: one producer feeds a bounded queue, consumers add and
    /// commit whole batches inside the exclusive gate. Insertion order across
    /// consumers is not row order, document ids still are.
    pub fn stream<R: Read + Send>(&self, ingestor: DatasetIngestor<R>) -> Result<IndexingReport> {
        let consumers = self.threads();
        let stats = ingestor.stats();
        let (tx, rx) = bounded::<Message>(self.config.queue_capacity.max(1));
        info!(
            backend = %self.backend,
            consumers,
            batch_size = self.config.batch_size,
            "Streaming dataset into writer"
        );

        let started = Instant::now();
        crossbeam::thread::scope(|s| {
            s.spawn(move |_| produce(ingestor, tx, consumers));
            for _ in 0..consumers {
                let rx = rx.clone();
                s.spawn(move |_| self.consume(rx));
            }
        })
        .map_err(|_| Error::new(ErrorKind::Internal, "an ingest thread panicked".to_string()))?;

        self.close();
        if let Some(e) = stats.take_error() {
            error!(backend = %self.backend, docs = self.counters.added.load(Ordering::Relaxed), error = %e, "Dataset stream broke off");
            return Err(e);
        }
        Ok(self.report(IngestMode::Streaming, stats.malformed(), started))
    }

    fn consume(&self, rx: Receiver<Message>) {
        let batch_size = self.config.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        while let Ok(Message::Row(row)) = rx.recv() {
            batch.push(self.document(&row));
            if batch.len() >= batch_size {
                self.flush(&mut batch);
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch);
        }
    }

    fn flush(&self, batch: &mut Vec<Document>) {
        let docs = mem::take(batch);
        let len = docs.len();
        self.gate.exclusive(|| match self.writer.add_documents(docs) {
            Ok(()) => {
                self.counters.added.fetch_add(len, Ordering::AcqRel);
                self.commit();
            }
            Err(e) => {
                self.counters.add_failures.fetch_add(len, Ordering::Relaxed);
                error!(backend = %self.backend, docs = len, error = %e, "Batch add failed");
            }
        });
    }
}

fn produce<R: Read>(ingestor: DatasetIngestor<R>, tx: Sender<Message>, consumers: usize) {
    for row in ingestor {
        if tx.send(Message::Row(row)).is_err() {
            error!("All consumers gone, stopping producer");
            return;
        }
    }
    for _ in 0..consumers {
        let _ = tx.send(Message::Eof);
    }
}
