//! HuggingFace inference API client for embeddings and text generation

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::{GenerationParams, LlmProvider};

/// Default inference endpoint
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference";

/// HuggingFace inference API client
pub struct HuggingFaceClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HuggingFaceClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Inference endpoint (e.g., "https://router.huggingface.co/hf-inference")
    /// * `token` - Access token, sent as a bearer token when present
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::invalid_configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B, context: &str) -> Result<reqwest::Response> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::from_http(context, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(context, status, &body));
        }

        Ok(response)
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// Feature extraction returns a flat vector for sentence models, or one row
/// per input for batched calls
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Flat(Vec<f32>),
    Rows(Vec<Vec<f32>>),
}

impl FeatureExtractionResponse {
    fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Self::Flat(v) => Some(v),
            Self::Rows(rows) => rows.into_iter().next(),
        }
    }
}

#[derive(Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: TextGenerationParameters<'a>,
}

#[derive(Serialize)]
struct TextGenerationParameters<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_new_tokens: u32,
    stop: &'a [String],
    return_full_text: bool,
}

impl<'a> TextGenerationRequest<'a> {
    fn new(prompt: &'a str, params: &'a GenerationParams) -> Self {
        Self {
            inputs: prompt,
            parameters: TextGenerationParameters {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                max_new_tokens: params.max_tokens,
                stop: &params.stop_sequences,
                return_full_text: false,
            },
        }
    }
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceClient {
    async fn embed(&self, model: &str, text: &str, _region: &str) -> Result<Vec<f32>> {
        let url = format!("{}/pipeline/feature-extraction", self.model_url(model));
        let context = format!("HuggingFace embedding with {}", model);

        let response = self
            .post(&url, &FeatureExtractionRequest { inputs: text }, &context)
            .await?;

        let parsed: FeatureExtractionResponse = response
            .json()
            .await
            .map_err(|e| Error::from_http(&context, e))?;

        parsed
            .into_vector()
            .ok_or_else(|| Error::service_unavailable(format!("{}: empty response", context)))
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
        _region: &str,
    ) -> Result<String> {
        let context = format!("HuggingFace generation with {}", model);
        let request = TextGenerationRequest::new(prompt, params);

        let response = self.post(&self.model_url(model), &request, &context).await?;
        let generated: Vec<GeneratedText> = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("{}: malformed response", context), Some(Box::new(e))))?;

        generated
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| Error::generation(format!("{}: no generated text", context), None))
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
