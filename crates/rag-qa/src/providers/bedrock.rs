//! AWS Bedrock runtime client for Titan embeddings and Claude completions

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::{GenerationParams, LlmProvider};

/// Bedrock runtime client with one SDK client per region.
///
/// Clients are created on first use of a region and reused afterwards.
#[derive(Default)]
pub struct BedrockClient {
    clients: DashMap<String, aws_sdk_bedrockruntime::Client>,
}

impl BedrockClient {
    /// Create a client with an empty region cache
    pub fn new() -> Self {
        Self::default()
    }

    async fn client_for(&self, region: &str) -> aws_sdk_bedrockruntime::Client {
        if let Some(client) = self.clients.get(region) {
            return client.clone();
        }

        let config = super::load_aws_config(region).await;
        let client = aws_sdk_bedrockruntime::Client::new(&config);
        tracing::info!("Bedrock runtime client initialised for {}", region);

        self.clients
            .entry(region.to_string())
            .or_insert(client)
            .clone()
    }

    /// Invoke `model` with a JSON body and decode the JSON response
    async fn invoke<B, R>(&self, model: &str, region: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let client = self.client_for(region).await;
        let payload = serde_json::to_vec(body)?;

        let output = client
            .invoke_model()
            .model_id(model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| map_invoke_error(model, region, e))?;

        serde_json::from_slice(output.body().as_ref()).map_err(|e| {
            Error::service_unavailable_with(format!("Malformed Bedrock response from {}", model), e)
        })
    }
}

fn map_invoke_error<R>(model: &str, region: &str, err: SdkError<InvokeModelError, R>) -> Error
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = format!("Bedrock {} in {}: {}", model, region, DisplayErrorContext(&err));
    if let SdkError::ServiceError(service) = &err {
        let e = service.err();
        if e.is_resource_not_found_exception() {
            return Error::not_found(message);
        }
        if e.is_validation_exception() {
            return Error::invalid_argument(message);
        }
    }
    Error::service_unavailable_with(message, err)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbedRequest<'a> {
    input_text: &'a str,
}

#[derive(Deserialize)]
struct TitanEmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ClaudeCompletionRequest<'a> {
    prompt: String,
    max_tokens_to_sample: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    stop_sequences: &'a [String],
}

impl<'a> ClaudeCompletionRequest<'a> {
    fn new(prompt: &str, params: &'a GenerationParams) -> Self {
        Self {
            prompt: format!("\n\nHuman: {}\n\nAssistant:", prompt),
            max_tokens_to_sample: params.max_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            stop_sequences: &params.stop_sequences,
        }
    }
}

#[derive(Deserialize)]
struct ClaudeCompletionResponse {
    completion: String,
}

#[async_trait]
impl EmbeddingProvider for BedrockClient {
    async fn embed(&self, model: &str, text: &str, region: &str) -> Result<Vec<f32>> {
        let response: TitanEmbedResponse = self
            .invoke(model, region, &TitanEmbedRequest { input_text: text })
            .await?;
        Ok(response.embedding)
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}

#[async_trait]
impl LlmProvider for BedrockClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
        region: &str,
    ) -> Result<String> {
        let request = ClaudeCompletionRequest::new(prompt, params);
        let response: ClaudeCompletionResponse = self.invoke(model, region, &request).await?;
        Ok(response.completion)
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_body_shape() {
        let params = GenerationParams::default();
        let body = serde_json::to_value(ClaudeCompletionRequest::new("What is AWS?", &params)).unwrap();

        assert_eq!(body["prompt"], "\n\nHuman: What is AWS?\n\nAssistant:");
        assert_eq!(body["max_tokens_to_sample"], 200);
        assert_eq!(body["top_k"], 250);
        assert_eq!(body["stop_sequences"], serde_json::json!(["\n\nHuman"]));
    }

    #[test]
    fn test_titan_body_shape() {
        let body = serde_json::to_value(TitanEmbedRequest { input_text: "hello" }).unwrap();
        assert_eq!(body, serde_json::json!({"inputText": "hello"}));

        let parsed: TitanEmbedResponse =
            serde_json::from_str(r#"{"embedding":[0.5,-1.0],"inputTextTokenCount":1}"#).unwrap();
        assert_eq!(parsed.embedding, vec![0.5, -1.0]);
    }
}
