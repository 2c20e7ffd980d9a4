//! Generative model selection and the LLM provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Answer;

/// Backend family serving a generative model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// AWS Bedrock runtime (Claude text completion)
    Bedrock,
    /// HuggingFace inference API (text generation)
    HuggingFace,
}

impl GenerationBackend {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl std::fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported generative models as `(name, backend)`
pub const GENERATION_MODELS: &[(&str, GenerationBackend)] = &[
    ("anthropic.claude-v2", GenerationBackend::Bedrock),
    ("meta-llama/Llama-2-7b-chat-hf", GenerationBackend::HuggingFace),
    ("microsoft/phi-2", GenerationBackend::HuggingFace),
    ("TinyLlama/TinyLlama-1.1B-Chat-v1.0", GenerationBackend::HuggingFace),
];

/// A validated (backend, model) pair for text generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    backend: GenerationBackend,
    model_name: &'static str,
}

impl GenerationRequest {
    /// Validate `model_name` against the models of `backend`
    pub fn new(backend: GenerationBackend, model_name: &str) -> Result<Self> {
        GENERATION_MODELS
            .iter()
            .find(|(name, b)| *b == backend && *name == model_name)
            .map(|(name, b)| Self {
                backend: *b,
                model_name: *name,
            })
            .ok_or_else(|| {
                Error::invalid_configuration(format!(
                    "Text model '{}' is not supported by {}",
                    model_name, backend
                ))
            })
    }

    /// Look up a model by name alone, inferring its backend
    pub fn for_model(model_name: &str) -> Result<Self> {
        GENERATION_MODELS
            .iter()
            .find(|(name, _)| *name == model_name)
            .map(|(name, b)| Self {
                backend: *b,
                model_name: *name,
            })
            .ok_or_else(|| Error::invalid_configuration(format!("Unknown text model '{}'", model_name)))
    }

    /// Backend serving this model
    pub fn backend(&self) -> GenerationBackend {
        self.backend
    }

    /// Model identifier
    pub fn model_name(&self) -> &str {
        self.model_name
    }
}

/// Sampling parameters for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sequences that end generation
    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_k() -> u32 {
    250
}

fn default_top_p() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    200
}

fn default_stop_sequences() -> Vec<String> {
    vec!["\n\nHuman".to_string()]
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            stop_sequences: default_stop_sequences(),
        }
    }
}

impl GenerationParams {
    /// Override the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::invalid_argument(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(Error::invalid_argument(format!(
                "top_p must be within (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::invalid_argument("max_tokens must be greater than 0"));
        }
        Ok(())
    }
}

/// Trait for one text-generation backend
///
/// Implementations:
/// - `BedrockClient`: AWS Bedrock (anthropic.claude-v2)
/// - `HuggingFaceClient`: HuggingFace inference API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete `prompt` with `model`; returns the raw completion text
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
        region: &str,
    ) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Routes generation requests to the backend named by the request
#[derive(Clone)]
pub struct Generator {
    bedrock: Arc<dyn LlmProvider>,
    huggingface: Arc<dyn LlmProvider>,
}

impl Generator {
    /// Create a generator from one provider per backend
    pub fn new(bedrock: Arc<dyn LlmProvider>, huggingface: Arc<dyn LlmProvider>) -> Self {
        Self { bedrock, huggingface }
    }

    fn provider(&self, backend: GenerationBackend) -> &dyn LlmProvider {
        match backend {
            GenerationBackend::Bedrock => self.bedrock.as_ref(),
            GenerationBackend::HuggingFace => self.huggingface.as_ref(),
        }
    }

    /// Generate an answer for an assembled prompt.
    ///
    /// The completion is returned unmodified. Every failure is reported as
    /// `GenerationFailed` with the backend error attached.
    pub async fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        params: &GenerationParams,
        region: &str,
    ) -> Result<Answer> {
        let provider = self.provider(request.backend());
        tracing::debug!(
            "Generating with {} via {} (prompt {} chars, temperature {})",
            request.model_name(),
            provider.name(),
            prompt.len(),
            params.temperature
        );

        match provider.complete(request.model_name(), prompt, params, region).await {
            Ok(text) => Ok(Answer::new(text)),
            Err(err @ Error::GenerationFailed { .. }) => Err(err),
            Err(err) => Err(Error::generation(
                format!("{} call to {} failed", provider.name(), request.model_name()),
                Some(Box::new(err)),
            )),
        }
    }
}
