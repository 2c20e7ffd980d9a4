//! Configuration for the question-answering pipeline
//!
//! Two layers: [`RagConfig`] holds tuning read from an optional TOML file,
//! and [`Settings`] holds deployment values (endpoints, credentials, names)
//! read from the environment with a secret-store fallback.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generation::PromptTemplate;
use crate::ingestion::Chunker;
use crate::providers::{
    EmbeddingRequest, GenerationParams, GenerationRequest, NoSecrets, SecretSource, SecretsManagerSource,
};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Text chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    /// HuggingFace inference configuration
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    /// Secret store configuration
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks placed into the prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name (backend inferred from the catalog)
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Concurrent embedding requests per document (default: CPU count, max 8)
    #[serde(default)]
    pub concurrency: Option<usize>,
}

fn default_embedding_model() -> String {
    "amazon.titan-embed-text-v1".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            concurrency: None,
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Generative model name (backend inferred from the catalog)
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Custom prompt template with `{question}` and `{context}`
    #[serde(default)]
    pub template: Option<String>,
    /// Sampling parameters
    #[serde(flatten)]
    pub params: GenerationParams,
}

fn default_generation_model() -> String {
    "anthropic.claude-v2".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            template: None,
            params: GenerationParams::default(),
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Qdrant over REST
    #[default]
    Qdrant,
    /// In-process index (not persisted)
    Memory,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Backend
    #[serde(default)]
    pub backend: VectorBackend,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HuggingFace inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    /// Inference endpoint
    #[serde(default = "default_hf_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_hf_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hf_base_url() -> String {
    crate::providers::huggingface::DEFAULT_BASE_URL.to_string()
}

fn default_hf_timeout_secs() -> u64 {
    120
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_hf_base_url(),
            timeout_secs: default_hf_timeout_secs(),
        }
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Secrets Manager secret consulted for unset settings
    #[serde(default)]
    pub secret_id: Option<String>,
}

impl RagConfig {
    /// Load configuration from a TOML file, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::invalid_configuration(format!("Cannot read config {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::invalid_configuration(format!("Invalid config: {}", e)))
    }

    /// Check every value that would otherwise fail on first use
    pub fn validate(&self) -> Result<()> {
        self.chunker()
            .map_err(|e| Error::invalid_configuration(e.to_string()))?;
        self.embedding_request()?;
        self.generation_request()?;
        self.prompt_template()?;
        self.generation
            .params
            .validate()
            .map_err(|e| Error::invalid_configuration(e.to_string()))?;
        if self.retrieval.top_k == 0 {
            return Err(Error::invalid_configuration("retrieval.top_k must be greater than 0"));
        }
        Ok(())
    }

    /// Chunker for the configured size and overlap
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
    }

    /// Validated default embedding model
    pub fn embedding_request(&self) -> Result<EmbeddingRequest> {
        EmbeddingRequest::for_model(&self.embedding.model)
    }

    /// Validated default generative model
    pub fn generation_request(&self) -> Result<GenerationRequest> {
        GenerationRequest::for_model(&self.generation.model)
    }

    /// Configured prompt template, or the default
    pub fn prompt_template(&self) -> Result<PromptTemplate> {
        match &self.generation.template {
            Some(template) => PromptTemplate::new(template),
            None => Ok(PromptTemplate::default()),
        }
    }
}

/// Environment variable names, also used as keys in the secret store
pub mod keys {
    pub const QDRANT_URL: &str = "QDRANT_URL";
    pub const QDRANT_API_KEY: &str = "QDRANT_API_KEY";
    pub const REGION: &str = "REGION";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const BUCKET_NAME: &str = "BUCKET_NAME";
    pub const COLLECTION_NAME: &str = "COLLECTION_NAME";
    pub const HUGGINGFACE_TOKEN: &str = "HUGGINGFACE_TOKEN";
}

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_COLLECTION: &str = "question_answering";
pub const DEFAULT_BUCKET: &str = "bedrock-question-answer";
pub const DOCUMENTS_ROOT: &str = "documents";

/// Local directory the CLI reads when ingesting `collection`
pub fn default_documents_dir(collection: &str) -> PathBuf {
    Path::new(DOCUMENTS_ROOT).join(collection)
}

/// Deployment settings resolved once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// Qdrant endpoint
    pub qdrant_url: Option<String>,
    /// Qdrant API key
    pub qdrant_api_key: Option<SecretString>,
    /// AWS region for Bedrock, S3 and Secrets Manager
    pub region: String,
    /// Bucket holding source documents
    pub bucket_name: String,
    /// Default collection
    pub collection_name: String,
    /// HuggingFace access token
    pub huggingface_token: Option<SecretString>,
}

impl Settings {
    /// Resolve from the process environment, asking `secrets` for unset values
    pub async fn resolve(secrets: &dyn SecretSource) -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok(), secrets).await
    }

    /// Resolve using the secret store named by `config`, if any
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        match &config.secrets.secret_id {
            Some(secret_id) => {
                let region = std::env::var(keys::REGION)
                    .or_else(|_| std::env::var(keys::AWS_REGION))
                    .unwrap_or_else(|_| DEFAULT_REGION.to_string());
                let source = SecretsManagerSource::for_region(&region, secret_id.clone()).await;
                Self::resolve(&source).await
            }
            None => Self::resolve(&NoSecrets).await,
        }
    }

    /// Resolve using `env` as the environment lookup
    pub async fn resolve_with<F>(env: F, secrets: &dyn SecretSource) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let region = match get(keys::REGION).or_else(|| get(keys::AWS_REGION)) {
            Some(region) => region,
            None => reveal(lookup(None, keys::REGION, secrets).await?).unwrap_or_else(|| {
                tracing::warn!("No region configured, using {}", DEFAULT_REGION);
                DEFAULT_REGION.to_string()
            }),
        };

        Ok(Self {
            qdrant_url: reveal(lookup(get(keys::QDRANT_URL), keys::QDRANT_URL, secrets).await?),
            qdrant_api_key: lookup(get(keys::QDRANT_API_KEY), keys::QDRANT_API_KEY, secrets).await?,
            region,
            bucket_name: reveal(lookup(get(keys::BUCKET_NAME), keys::BUCKET_NAME, secrets).await?)
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            collection_name: reveal(lookup(get(keys::COLLECTION_NAME), keys::COLLECTION_NAME, secrets).await?)
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            huggingface_token: lookup(get(keys::HUGGINGFACE_TOKEN), keys::HUGGINGFACE_TOKEN, secrets).await?,
        })
    }

    /// Qdrant endpoint, required by the qdrant backend
    pub fn require_qdrant_url(&self) -> Result<&str> {
        self.qdrant_url
            .as_deref()
            .ok_or_else(|| Error::invalid_configuration(format!("{} is not set", keys::QDRANT_URL)))
    }
}

/// Environment value if set, otherwise the secret source's value
async fn lookup(env_value: Option<String>, name: &str, secrets: &dyn SecretSource) -> Result<Option<SecretString>> {
    if let Some(value) = env_value {
        return Ok(Some(SecretString::new(value)));
    }
    let value = secrets.get(name).await?;
    if value.is_some() {
        tracing::debug!("{} resolved from secret source {}", name, secrets.name());
    }
    Ok(value)
}

/// Unwrap a non-credential setting
fn reveal(value: Option<SecretString>) -> Option<String> {
    use secrecy::ExposeSecret;
    value.map(|v| v.expose_secret().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::providers::StaticSecrets;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_documents_dir() {
        assert_eq!(default_documents_dir("cnu"), PathBuf::from("documents/cnu"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 2);
    }

    #[test]
    fn test_parse_toml() {
        let config = RagConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 800

            [embedding]
            model = "BAAI/bge-small-en"

            [generation]
            model = "microsoft/phi-2"
            temperature = 0.2

            [vector_index]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.generation.params.temperature, 0.2);
        assert_eq!(config.generation.params.top_k, 250);
        assert_eq!(config.vector_index.backend, VectorBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 500;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfiguration);

        let mut config = RagConfig::default();
        config.embedding.model = "text-embedding-005".to_string();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfiguration);

        let mut config = RagConfig::default();
        config.generation.template = Some("no placeholders".to_string());
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfiguration);
    }

    #[tokio::test]
    async fn test_settings_env_wins_over_secrets() {
        let secrets = StaticSecrets::new()
            .with(keys::QDRANT_URL, "https://from-secret:6333")
            .with(keys::QDRANT_API_KEY, "secret-key");
        let settings = Settings::resolve_with(env(&[(keys::QDRANT_URL, "http://localhost:6333")]), &secrets)
            .await
            .unwrap();

        assert_eq!(settings.qdrant_url.as_deref(), Some("http://localhost:6333"));
        assert_eq!(settings.qdrant_api_key.unwrap().expose_secret(), "secret-key");
    }

    #[tokio::test]
    async fn test_settings_defaults() {
        let settings = Settings::resolve_with(env(&[]), &NoSecrets).await.unwrap();

        assert_eq!(settings.region, DEFAULT_REGION);
        assert_eq!(settings.collection_name, DEFAULT_COLLECTION);
        assert_eq!(settings.bucket_name, DEFAULT_BUCKET);
        assert_eq!(settings.require_qdrant_url().unwrap_err().kind(), ErrorKind::InvalidConfiguration);
    }

    #[tokio::test]
    async fn test_settings_aws_region_fallback() {
        let settings = Settings::resolve_with(env(&[(keys::AWS_REGION, "eu-west-1")]), &NoSecrets)
            .await
            .unwrap();
        assert_eq!(settings.region, "eu-west-1");
    }
}
