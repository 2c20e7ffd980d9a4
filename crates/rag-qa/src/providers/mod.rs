//! Provider abstractions for embeddings, LLM, vector indexing, document storage and secrets
//!
//! This module provides trait-based abstractions over the external services
//! the pipeline talks to (Bedrock, HuggingFace, Qdrant, S3, Secrets Manager),
//! plus local implementations for development and tests.

pub mod bedrock;
pub mod document_store;
pub mod embedding;
pub mod huggingface;
pub mod llm;
pub mod local;
pub mod memory;
pub mod qdrant;
pub mod s3;
pub mod secrets;
pub mod vector_store;

pub use bedrock::BedrockClient;
pub use document_store::DocumentStore;
pub use embedding::{Embedder, EmbeddingBackend, EmbeddingModel, EmbeddingProvider, EmbeddingRequest, EMBEDDING_MODELS};
pub use huggingface::HuggingFaceClient;
pub use llm::{GenerationBackend, GenerationParams, GenerationRequest, Generator, LlmProvider, GENERATION_MODELS};
pub use local::LocalDocumentStore;
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
pub use s3::S3DocumentStore;
pub use secrets::{NoSecrets, SecretSource, SecretsManagerSource, StaticSecrets};
pub use vector_store::VectorIndex;

/// Load the shared AWS SDK configuration for `region`
pub async fn load_aws_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}
