//! Shared fixtures: deterministic providers and an in-memory pipeline

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use rag_qa::error::{Error, Result};
use rag_qa::generation::PromptTemplate;
use rag_qa::providers::{
    Embedder, EmbeddingProvider, EmbeddingRequest, GenerationParams, Generator, LlmProvider, MemoryIndex, VectorIndex,
};
use rag_qa::Pipeline;

pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const TEXT_MODEL: &str = "microsoft/phi-2";

/// Bag-of-characters embedding sized for the requested model
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, model: &str, text: &str, _region: &str) -> Result<Vec<f32>> {
        let dimensions = EmbeddingRequest::for_model(model)?.dimensions();
        let mut vector = vec![0.0f32; dimensions];
        vector[0] = 1.0;
        for c in text.chars().filter(|c| c.is_alphanumeric()) {
            let slot = 1 + (c.to_ascii_lowercase() as usize) % (dimensions - 1);
            vector[slot] += 1.0;
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "letters"
    }
}

/// Embedding provider that is always unreachable
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, model: &str, _text: &str, _region: &str) -> Result<Vec<f32>> {
        Err(Error::service_unavailable(format!("{} is unreachable", model)))
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// LLM that records every prompt and answers with a fixed string
#[derive(Default)]
pub struct RecordingLlm {
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn complete(&self, _model: &str, prompt: &str, _params: &GenerationParams, _region: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(" AWS is a cloud platform.".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct Fixture {
    pub pipeline: Arc<Pipeline>,
    pub index: Arc<MemoryIndex>,
    pub llm: Arc<RecordingLlm>,
}

pub fn fixture() -> Fixture {
    fixture_with(Arc::new(LetterEmbedder))
}

pub fn fixture_with(embedder: Arc<dyn EmbeddingProvider>) -> Fixture {
    let index = Arc::new(MemoryIndex::new());
    let llm = Arc::new(RecordingLlm::default());
    let pipeline = Pipeline::new(
        Embedder::new(embedder.clone(), embedder),
        index.clone() as Arc<dyn VectorIndex>,
        Generator::new(llm.clone(), llm.clone()),
        PromptTemplate::default(),
    )
    .with_embedding_concurrency(2);

    Fixture {
        pipeline: Arc::new(pipeline),
        index,
        llm,
    }
}

/// `len` characters of lowercase letters
pub fn letters(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}
