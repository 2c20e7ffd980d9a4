//! Ingestion and question-answering pipelines
//!
//! `ingest` runs Loading -> Splitting -> Embedding -> Upserting; `ask` runs
//! EmbeddingQuestion -> Retrieving -> Assembling -> Generating. A failing
//! stage is reported as [`Error::Stage`] around the component's error. There
//! is no rollback and no automatic retry: points upserted before a failure
//! stay in the collection, and re-running the ingestion overwrites them.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{RagConfig, Settings, VectorBackend};
use crate::error::{Error, Result};
use crate::generation::PromptTemplate;
use crate::ingestion::{Chunker, TextExtractor};
use crate::providers::{
    BedrockClient, Embedder, EmbeddingRequest, GenerationParams, GenerationRequest, Generator, HuggingFaceClient,
    MemoryIndex, QdrantIndex, VectorIndex,
};
use crate::retrieval::Retriever;
use crate::types::{AskOutcome, Chunk, CollectionInfo, CollectionState, Document, IndexedChunk, PromptContext};

/// Pipeline stage, attached to errors and logged at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Extracting text from the raw document
    Loading,
    /// Splitting text into chunks
    Splitting,
    /// Embedding chunk texts
    Embedding,
    /// Writing points to the vector index
    Upserting,
    /// Embedding the question
    EmbeddingQuestion,
    /// Querying the vector index
    Retrieving,
    /// Rendering the prompt
    Assembling,
    /// Calling the generative model
    Generating,
}

impl Stage {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Splitting => "splitting",
            Self::Embedding => "embedding",
            Self::Upserting => "upserting",
            Self::EmbeddingQuestion => "embedding_question",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Generating => "generating",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Target collection
    pub collection: String,
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub overlap: usize,
    /// Embedding model used for chunks
    pub embedding: EmbeddingRequest,
    /// Region for regional backends
    pub region: String,
    /// Drop and recreate the collection before upserting
    pub force_recreate: bool,
}

/// Options for one question
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Collection to search
    pub collection: String,
    /// Number of chunks to retrieve
    pub k: usize,
    /// Embedding model; must be the one the collection was built with
    pub embedding: EmbeddingRequest,
    /// Generative model
    pub generation: GenerationRequest,
    /// Sampling parameters
    pub params: GenerationParams,
    /// Region for regional backends
    pub region: String,
}

/// Orchestrates extraction, chunking, embedding, indexing, retrieval and generation
pub struct Pipeline {
    embedder: Embedder,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    generator: Generator,
    template: PromptTemplate,
    embedding_concurrency: usize,
}

impl Pipeline {
    /// Create a pipeline from shared clients
    pub fn new(embedder: Embedder, index: Arc<dyn VectorIndex>, generator: Generator, template: PromptTemplate) -> Self {
        Self {
            embedder,
            retriever: Retriever::new(Arc::clone(&index)),
            index,
            generator,
            template,
            embedding_concurrency: num_cpus::get().clamp(1, 8),
        }
    }

    /// Build a pipeline with the backends selected by `config`.
    ///
    /// One Bedrock client (per-region cache) and one HuggingFace client are
    /// shared between embedding and generation.
    pub fn from_config(config: &RagConfig, settings: &Settings) -> Result<Self> {
        let bedrock = Arc::new(BedrockClient::new());
        let huggingface = Arc::new(HuggingFaceClient::new(
            config.huggingface.base_url.clone(),
            settings.huggingface_token.clone(),
            Duration::from_secs(config.huggingface.timeout_secs),
        )?);

        let index: Arc<dyn VectorIndex> = match config.vector_index.backend {
            VectorBackend::Qdrant => {
                let url = settings.require_qdrant_url()?;
                tracing::info!("Using Qdrant vector index at {}", url);
                Arc::new(QdrantIndex::new(
                    url,
                    settings.qdrant_api_key.clone(),
                    Duration::from_secs(config.vector_index.timeout_secs),
                )?)
            }
            VectorBackend::Memory => {
                tracing::warn!("Using in-memory vector index; collections are lost on exit");
                Arc::new(MemoryIndex::new())
            }
        };

        let mut pipeline = Self::new(
            Embedder::new(bedrock.clone(), huggingface.clone()),
            index,
            Generator::new(bedrock, huggingface),
            config.prompt_template()?,
        );
        if let Some(concurrency) = config.embedding.concurrency {
            pipeline = pipeline.with_embedding_concurrency(concurrency);
        }
        Ok(pipeline)
    }

    /// Set how many chunk embeddings may be in flight at once
    pub fn with_embedding_concurrency(mut self, concurrency: usize) -> Self {
        self.embedding_concurrency = concurrency.max(1);
        self
    }

    /// The prompt template used by `ask`
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Ingest one document into a collection
    pub async fn ingest(&self, document: &Document, options: &IngestOptions) -> Result<CollectionState> {
        check_collection(&options.collection)?;
        let started = Instant::now();

        tracing::info!(
            stage = %Stage::Loading,
            "Extracting text from '{}' ({}, {} bytes)",
            document.name,
            document.file_type.display_name(),
            document.len()
        );
        let text = TextExtractor::extract(document)
            .await
            .map_err(|e| e.at_stage(Stage::Loading))?;

        tracing::info!(stage = %Stage::Splitting, "Splitting {} chars", text.len());
        let chunker = Chunker::new(options.chunk_size, options.overlap).map_err(|e| e.at_stage(Stage::Splitting))?;
        let chunks: Vec<Chunk> = chunker.split(&text, &document.name).collect();
        if chunks.is_empty() {
            tracing::warn!("Document '{}' produced no text to index", document.name);
        }

        tracing::info!(
            stage = %Stage::Embedding,
            "Embedding {} chunks with {}",
            chunks.len(),
            options.embedding.model_name()
        );
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_all(&options.embedding, &texts, &options.region, self.embedding_concurrency)
            .await
            .map_err(|e| e.at_stage(Stage::Embedding))?;

        let points: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk::new(chunk, vector))
            .collect();

        tracing::info!(
            stage = %Stage::Upserting,
            "Upserting {} points into '{}' via {}",
            points.len(),
            options.collection,
            self.index.name()
        );
        let info = self
            .upsert_points(&options.collection, &options.embedding, options.force_recreate, &points)
            .await
            .map_err(|e| e.at_stage(Stage::Upserting))?;

        tracing::info!(
            "Ingested '{}' into '{}': {} chunks, {} points total ({:.2}s)",
            document.name,
            options.collection,
            points.len(),
            info.points_count,
            started.elapsed().as_secs_f64()
        );

        Ok(CollectionState {
            collection: options.collection.clone(),
            document: document.name.clone(),
            chunks_upserted: points.len(),
            info,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Ingest several documents into one collection.
    ///
    /// `force_recreate` applies to the first document only, so the batch
    /// starts from an empty collection and accumulates.
    pub async fn ingest_all(&self, documents: &[Document], options: &IngestOptions) -> Result<Vec<CollectionState>> {
        self.ingest_all_with(documents, options, |_| {}).await
    }

    /// Like [`Pipeline::ingest_all`], calling `on_ingested` after each document
    pub async fn ingest_all_with<F>(
        &self,
        documents: &[Document],
        options: &IngestOptions,
        mut on_ingested: F,
    ) -> Result<Vec<CollectionState>>
    where
        F: FnMut(&CollectionState) + Send,
    {
        let mut states = Vec::with_capacity(documents.len());
        let mut options = options.clone();
        for document in documents {
            let state = self.ingest(document, &options).await?;
            on_ingested(&state);
            states.push(state);
            options.force_recreate = false;
        }
        Ok(states)
    }

    async fn upsert_points(
        &self,
        collection: &str,
        embedding: &EmbeddingRequest,
        force_recreate: bool,
        points: &[IndexedChunk],
    ) -> Result<CollectionInfo> {
        self.index
            .create(collection, embedding.dimensions(), force_recreate)
            .await?;
        if !points.is_empty() {
            self.index.upsert(collection, points).await?;
        }
        self.index.describe(collection).await
    }

    /// Answer a question from the chunks of a collection.
    ///
    /// An empty retrieval is not an error; the model is asked with an empty
    /// context.
    pub async fn ask(&self, question: &str, options: &AskOptions) -> Result<AskOutcome> {
        check_collection(&options.collection)?;
        if question.trim().is_empty() {
            return Err(Error::invalid_argument("question must not be empty"));
        }
        options.params.validate()?;
        let started = Instant::now();

        tracing::info!(
            stage = %Stage::EmbeddingQuestion,
            "Embedding question with {}",
            options.embedding.model_name()
        );
        let vector = self
            .embedder
            .embed(&options.embedding, question, &options.region)
            .await
            .map_err(|e| e.at_stage(Stage::EmbeddingQuestion))?;

        tracing::info!(stage = %Stage::Retrieving, "Retrieving top {} from '{}'", options.k, options.collection);
        let retrieved = self
            .retriever
            .retrieve(&options.collection, &vector, options.k)
            .await
            .map_err(|e| e.at_stage(Stage::Retrieving))?;

        tracing::info!(stage = %Stage::Assembling, "Assembling prompt from {} chunks", retrieved.len());
        let prompt = self.template.assemble(&PromptContext::new(question, retrieved));
        tracing::debug!("Prompt:\n{}", prompt.text);

        tracing::info!(
            stage = %Stage::Generating,
            "Generating answer with {}",
            options.generation.model_name()
        );
        let answer = self
            .generator
            .generate(&prompt.text, &options.generation, &options.params, &options.region)
            .await
            .map_err(|e| e.at_stage(Stage::Generating))?;

        tracing::info!(
            "Answered from {} chunks in {:.2}s",
            prompt.chunks_used,
            started.elapsed().as_secs_f64()
        );

        Ok(AskOutcome {
            answer,
            chunks_used: prompt.chunks_used,
        })
    }

    /// Collection metadata
    pub async fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        check_collection(collection)?;
        self.index.describe(collection).await
    }

    /// Drop a collection
    pub async fn delete(&self, collection: &str) -> Result<()> {
        check_collection(collection)?;
        self.index.delete(collection).await?;
        tracing::info!("Deleted collection '{}'", collection);
        Ok(())
    }

    /// Create a collection sized for `embedding`
    pub async fn create(&self, collection: &str, embedding: &EmbeddingRequest, force_recreate: bool) -> Result<()> {
        check_collection(collection)?;
        self.index
            .create(collection, embedding.dimensions(), force_recreate)
            .await
    }
}

fn check_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(Error::invalid_argument("collection name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::EmbeddingQuestion.to_string(), "embedding_question");
        assert_eq!(
            serde_json::to_value(Stage::Upserting).unwrap(),
            serde_json::json!("upserting")
        );
    }
}
