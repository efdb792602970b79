pub mod segment;
pub mod mvcc;
pub mod format;
pub mod merge;
pub mod writer;
pub mod reader;
