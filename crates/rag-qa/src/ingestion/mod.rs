//! Document ingestion: text extraction and chunking

mod chunker;
mod parser;

pub use chunker::{Chunker, Chunks};
pub use parser::TextExtractor;
