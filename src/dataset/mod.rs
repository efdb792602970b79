pub mod source;
pub mod parser;
pub mod ingestor;
pub mod queries;
