//! rag-qa: retrieval-augmented question answering over your documents
//!
//! Documents are split into overlapping chunks, embedded through Bedrock or
//! HuggingFace, and stored in a Qdrant collection. Questions are embedded
//! with the same model, the nearest chunks are pasted into a prompt
//! template, and a generative model writes the answer.
//!
//! The same [`Pipeline`] backs the HTTP service (`rag-qa-server`), the
//! object-storage ingestion trigger (`rag-qa-ingest`) and the management
//! CLI (`rag-qa`).

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod trigger;
pub mod types;

pub use config::{RagConfig, Settings};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{AskOptions, IngestOptions, Pipeline, Stage};
pub use types::{
    document::{Chunk, Document, FileType, IndexedChunk, RetrievedChunk},
    query::{AskRequest, PromptContext},
    response::{Answer, AskOutcome, AskResponse, CollectionInfo, CollectionState},
};
