//! Core types for the question-answering pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{sort_by_score, Chunk, Document, FileType, IndexedChunk, RetrievedChunk};
pub use query::{AskRequest, PromptContext};
pub use response::{Answer, AskOutcome, AskResponse, CollectionInfo, CollectionState, CollectionStatus};
