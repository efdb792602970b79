pub mod core;
pub mod dataset;
pub mod store;
pub mod indexing;
pub mod backend;
pub mod query;
pub mod metrics;
pub mod report;
pub mod runner;

/*
┌──────────────────────────────────── INGEST ─────────────────────────────────────┐
│                                                                                  │
│  open_dataset (plain/zip/gz/bz2) ──► DatasetIngestor ──► RowRecord {ordinal,     │
│                                        │ csv + nom         title, VectorRecord}  │
│                                        ▼                                         │
│                       IndexingCoordinator (per backend)                          │
│                        • Indexed:   rayon pool, row i ─► doc i                   │
│                        • Streaming: producer ─► crossbeam bounded ─► C consumers │
│                        CommitGate: adds shared, commits exclusive                │
└────────────────────────────────────────┬─────────────────────────────────────────┘
                                         ▼
┌──────────────────────────────────── STORE ──────────────────────────────────────┐
│  IndexWriter ── commit ──► Segment ──► SnapshotController (MVCC versions)        │
│      │ close: MergePolicy (NoMerge / TrivialMerge / NonTrivialMerge)             │
│      ▼                                                                           │
│  IndexReader::open(snapshot) ── leaves, export_vectors                           │
└────────────────────────────────────────┬─────────────────────────────────────────┘
                                         ▼
┌─────────────────────────────────── BACKENDS ────────────────────────────────────┐
│  trait VectorSearcher                                                            │
│   • GraphSearcher        parallel scan over leaves, best-first                   │
│   • AcceleratedSearcher  AcceleratorBinding (libloading / emulated)              │
│                          Bytes ─► decoder (scores @4i, ids @4(N+i)) worst-first  │
└────────────────────────────────────────┬─────────────────────────────────────────┘
                                         ▼
┌──────────────────────────────────── QUERY ──────────────────────────────────────┐
│  QueryExecutor (rayon pool) ─► best_first ─► QueryResult ─► MetricsAggregator    │
│  report: neighbors.csv, benchmark_results.json                                   │
└──────────────────────────────────────────────────────────────────────────────────┘
*/
