//! Query-side types: the HTTP ask request and the prompt context

use serde::{Deserialize, Serialize};

use super::document::{Chunk, RetrievedChunk};

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub text: String,

    /// Sampling temperature override (defaults to the configured value)
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AskRequest {
    /// Create a new ask request
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            temperature: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// The question and the retrieved chunks, in retrieval order
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Question asked by the user
    pub question: String,
    /// Chunks to place into the context, most similar first
    pub chunks: Vec<Chunk>,
}

impl PromptContext {
    /// Create a context from a question and retrieved chunks
    pub fn new(question: impl Into<String>, retrieved: Vec<RetrievedChunk>) -> Self {
        Self {
            question: question.into(),
            chunks: retrieved.into_iter().map(|r| r.chunk).collect(),
        }
    }

    /// Number of chunks in the context
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the context holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
