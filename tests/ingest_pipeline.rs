use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use flate2::Compression;
use flate2::write::GzEncoder;
use knnduel::backend::IndexBackend;
use knnduel::core::config::{BenchmarkConfig, IngestMode, MergeStrategy};
use knnduel::dataset::ingestor::{load_dataset, DatasetIngestor};
use knnduel::indexing::IndexingCoordinator;
use knnduel::store::format::high_dimension_selector;
use knnduel::store::writer::{IndexWriter, WriterConfig};

const DIM: usize = 128;

/// 1000 lines: one header and 999 data rows.
fn thousand_line_csv() -> String {
    let mut text = String::from("id,title,text,title_vector\n");
    for i in 0..999 {
        let vector: Vec<String> = (0..DIM).map(|d| format!("{}", (i * 31 + d) % 97)).collect();
        text.push_str(&format!("{},row {},text,\"[{}]\"\n", i, i, vector.join(", ")));
    }
    text
}

fn config(dataset_file: PathBuf, mode: IngestMode) -> BenchmarkConfig {
    BenchmarkConfig {
        dataset_file,
        vector_column_index: 3,
        num_docs: 5000,
        vector_dimension: DIM,
        commit_frequency: 100,
        batch_size: 100,
        graph_writer_threads: 4,
        ingest_mode: mode,
        merge_strategy: MergeStrategy::NoMerge,
        ..BenchmarkConfig::default()
    }
}

fn writer(config: &BenchmarkConfig) -> Arc<IndexWriter> {
    Arc::new(
        IndexWriter::open(WriterConfig {
            vector_field: config.vector_column_name.clone(),
            dimension: DIM,
            merge_strategy: config.merge_strategy,
            format_selector: high_dimension_selector(&config.vector_column_name, DIM, config.graph),
        })
        .unwrap(),
    )
}

fn gzip(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("dataset.csv.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap();
    path
}

fn committed_ids(writer: &IndexWriter) -> Vec<u32> {
    writer
        .snapshot()
        .segments
        .iter()
        .flat_map(|s| s.docs.iter().map(|d| d.id.0))
        .collect()
}

#[test]
fn streaming_four_consumers_index_999_documents_from_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(gzip(dir.path(), &thousand_line_csv()), IngestMode::Streaming);
    let writer = writer(&config);

    let coordinator = IndexingCoordinator::new(&config, IndexBackend::Graph, writer.clone());
    let report = coordinator.stream(DatasetIngestor::open(&config).unwrap()).unwrap();

    assert_eq!(report.docs_added, 999);
    assert_eq!(report.malformed_rows, 0);
    let ids = committed_ids(&writer);
    assert_eq!(ids.len(), 999);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 999);
    assert_eq!(*ids.iter().max().unwrap(), 998);
}

#[test]
fn indexed_mode_matches_streaming_document_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    fs::write(&path, thousand_line_csv()).unwrap();

    let indexed_config = config(path.clone(), IngestMode::Indexed);
    let dataset = load_dataset(&indexed_config).unwrap();
    let indexed_writer = writer(&indexed_config);
    IndexingCoordinator::new(&indexed_config, IndexBackend::Graph, indexed_writer.clone())
        .index_loaded(&dataset)
        .unwrap();

    let streaming_config = config(path, IngestMode::Streaming);
    let streaming_writer = writer(&streaming_config);
    IndexingCoordinator::new(&streaming_config, IndexBackend::Graph, streaming_writer.clone())
        .stream(DatasetIngestor::open(&streaming_config).unwrap())
        .unwrap();

    let mut a = committed_ids(&indexed_writer);
    let mut b = committed_ids(&streaming_writer);
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
    assert_eq!(a, (0..999).collect::<Vec<_>>());
}

#[test]
fn trivial_merge_leaves_one_segment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    fs::write(&path, thousand_line_csv()).unwrap();
    let config = BenchmarkConfig {
        merge_strategy: MergeStrategy::TrivialMerge,
        ..config(path, IngestMode::Indexed)
    };
    let dataset = load_dataset(&config).unwrap();
    let writer = writer(&config);
    let report = IndexingCoordinator::new(&config, IndexBackend::Accelerated, writer.clone())
        .index_loaded(&dataset)
        .unwrap();

    assert_eq!(report.commits, 10);
    let snapshot = writer.snapshot();
    assert_eq!(snapshot.segments.len(), 1);
    assert_eq!(snapshot.doc_count, 999);
}

#[test]
fn row_limit_and_malformed_rows_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let mut text = thousand_line_csv();
    text.insert_str(text.find('\n').unwrap() + 1, "x,broken,text,\"[not, numbers]\"\n");
    fs::write(&path, text).unwrap();

    let config = BenchmarkConfig { num_docs: 250, ..config(path, IngestMode::Indexed) };
    let dataset = load_dataset(&config).unwrap();
    assert_eq!(dataset.records.len(), 250);
    assert_eq!(dataset.malformed, 1);
    assert_eq!(dataset.records[0].title, "row 0");
}

#[test]
fn truncated_gzip_is_an_io_error_not_a_short_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = gzip(dir.path(), &thousand_line_csv());
    let packed = fs::read(&path).unwrap();
    fs::write(&path, &packed[..packed.len() / 2]).unwrap();

    let err = load_dataset(&config(path.clone(), IngestMode::Indexed)).unwrap_err();
    assert_eq!(err.kind, knnduel::core::error::ErrorKind::Io);

    let config = config(path, IngestMode::Streaming);
    let coordinator = IndexingCoordinator::new(&config, IndexBackend::Graph, writer(&config));
    let err = coordinator.stream(DatasetIngestor::open(&config).unwrap()).unwrap_err();
    assert_eq!(err.kind, knnduel::core::error::ErrorKind::Io);
}
