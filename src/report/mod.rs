pub mod writer;

pub use writer::{write_neighbors, write_summary, BenchmarkSummary, NEIGHBORS_FILE, SUMMARY_FILE};
