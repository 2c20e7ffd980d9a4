//! Embedding backend selection and the embedding provider trait

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Backend family serving an embedding model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// AWS Bedrock runtime
    Bedrock,
    /// HuggingFace inference API
    HuggingFace,
}

impl EmbeddingBackend {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bedrock" | "aws" => Ok(Self::Bedrock),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(Error::invalid_configuration(format!(
                "Unknown embedding backend '{}' (expected bedrock or huggingface)",
                other
            ))),
        }
    }
}

/// A supported embedding model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingModel {
    /// Model identifier passed to the backend
    pub name: &'static str,
    /// Backend serving the model
    pub backend: EmbeddingBackend,
    /// Output vector length
    pub dimensions: usize,
}

/// Supported embedding models
pub const EMBEDDING_MODELS: &[EmbeddingModel] = &[
    EmbeddingModel {
        name: "amazon.titan-embed-text-v1",
        backend: EmbeddingBackend::Bedrock,
        dimensions: 1536,
    },
    EmbeddingModel {
        name: "BAAI/bge-small-en",
        backend: EmbeddingBackend::HuggingFace,
        dimensions: 384,
    },
    EmbeddingModel {
        name: "sentence-transformers/all-MiniLM-L6-v2",
        backend: EmbeddingBackend::HuggingFace,
        dimensions: 384,
    },
    EmbeddingModel {
        name: "sentence-transformers/all-mpnet-base-v2",
        backend: EmbeddingBackend::HuggingFace,
        dimensions: 768,
    },
    EmbeddingModel {
        name: "sentence-transformers/all-distilroberta-v1",
        backend: EmbeddingBackend::HuggingFace,
        dimensions: 768,
    },
];

/// A validated (backend, model) pair.
///
/// Can only be constructed for models in [`EMBEDDING_MODELS`], so every
/// request reaching a provider names a model that provider serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingRequest {
    model: EmbeddingModel,
}

impl EmbeddingRequest {
    /// Validate `model_name` against the models of `backend`
    pub fn new(backend: EmbeddingBackend, model_name: &str) -> Result<Self> {
        EMBEDDING_MODELS
            .iter()
            .find(|m| m.backend == backend && m.name == model_name)
            .map(|m| Self { model: *m })
            .ok_or_else(|| {
                let supported: Vec<&str> = EMBEDDING_MODELS
                    .iter()
                    .filter(|m| m.backend == backend)
                    .map(|m| m.name)
                    .collect();
                Error::invalid_configuration(format!(
                    "Embedding model '{}' is not supported by {} (supported: {})",
                    model_name,
                    backend,
                    supported.join(", ")
                ))
            })
    }

    /// Look up a model by name alone, inferring its backend
    pub fn for_model(model_name: &str) -> Result<Self> {
        EMBEDDING_MODELS
            .iter()
            .find(|m| m.name == model_name)
            .map(|m| Self { model: *m })
            .ok_or_else(|| {
                Error::invalid_configuration(format!("Unknown embedding model '{}'", model_name))
            })
    }

    /// Backend serving this model
    pub fn backend(&self) -> EmbeddingBackend {
        self.model.backend
    }

    /// Model identifier
    pub fn model_name(&self) -> &str {
        self.model.name
    }

    /// Output vector length of the model
    pub fn dimensions(&self) -> usize {
        self.model.dimensions
    }
}

/// Trait for one embedding backend
///
/// Implementations:
/// - `BedrockClient`: AWS Bedrock (Titan embeddings)
/// - `HuggingFaceClient`: HuggingFace inference API (sentence-transformers)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text with `model`; backends without regions ignore `region`
    async fn embed(&self, model: &str, text: &str, region: &str) -> Result<Vec<f32>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Routes embedding requests to the backend named by the request
#[derive(Clone)]
pub struct Embedder {
    bedrock: Arc<dyn EmbeddingProvider>,
    huggingface: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    /// Create an embedder from one provider per backend
    pub fn new(bedrock: Arc<dyn EmbeddingProvider>, huggingface: Arc<dyn EmbeddingProvider>) -> Self {
        Self { bedrock, huggingface }
    }

    fn provider(&self, backend: EmbeddingBackend) -> &dyn EmbeddingProvider {
        match backend {
            EmbeddingBackend::Bedrock => self.bedrock.as_ref(),
            EmbeddingBackend::HuggingFace => self.huggingface.as_ref(),
        }
    }

    /// Embed one text
    pub async fn embed(&self, request: &EmbeddingRequest, text: &str, region: &str) -> Result<Vec<f32>> {
        let provider = self.provider(request.backend());
        tracing::debug!(
            "Embedding {} chars with {} via {}",
            text.len(),
            request.model_name(),
            provider.name()
        );

        let vector = provider.embed(request.model_name(), text, region).await?;
        if vector.is_empty() {
            return Err(Error::service_unavailable(format!(
                "{} returned an empty embedding for model {}",
                provider.name(),
                request.model_name()
            )));
        }
        Ok(vector)
    }

    /// Embed many texts with at most `concurrency` requests in flight.
    ///
    /// Output order matches input order.
    pub async fn embed_all(
        &self,
        request: &EmbeddingRequest,
        texts: &[String],
        region: &str,
        concurrency: usize,
    ) -> Result<Vec<Vec<f32>>> {
        futures::stream::iter(texts)
            .map(|text| self.embed(request, text, region))
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}
