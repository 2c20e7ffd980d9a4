//! Secret sources used as a fallback for unset environment settings

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, SdkError};
use secrecy::SecretString;
use std::collections::HashMap;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};

/// Trait for looking up named secrets
///
/// Implementations:
/// - `SecretsManagerSource`: one AWS Secrets Manager secret holding a JSON object
/// - `StaticSecrets`: fixed in-memory map
/// - `NoSecrets`: never returns a value
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Look up `name`; `Ok(None)` when the source has no such value
    async fn get(&self, name: &str) -> Result<Option<SecretString>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Secret source that has nothing to offer
pub struct NoSecrets;

#[async_trait]
impl SecretSource for NoSecrets {
    async fn get(&self, _name: &str) -> Result<Option<SecretString>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Secret source backed by a fixed map
#[derive(Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn get(&self, name: &str) -> Result<Option<SecretString>> {
        Ok(self.values.get(name).map(|v| SecretString::new(v.clone())))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// AWS Secrets Manager secret whose `SecretString` is a JSON object mapping
/// setting names to values. Fetched on first lookup, then cached.
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
    secret_id: String,
    values: OnceCell<HashMap<String, String>>,
}

impl SecretsManagerSource {
    /// Wrap an existing client
    pub fn new(client: aws_sdk_secretsmanager::Client, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
            values: OnceCell::new(),
        }
    }

    /// Create a client for `region` using the default credential chain
    pub async fn for_region(region: &str, secret_id: impl Into<String>) -> Self {
        let config = super::load_aws_config(region).await;
        Self::new(aws_sdk_secretsmanager::Client::new(&config), secret_id)
    }

    async fn fetch(&self) -> Result<HashMap<String, String>> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Secret '{}': {}", self.secret_id, DisplayErrorContext(&e));
                match &e {
                    SdkError::ServiceError(se) if se.err().is_resource_not_found_exception() => {
                        Error::not_found(message)
                    }
                    _ => Error::service_unavailable_with(message, e),
                }
            })?;

        let raw = output.secret_string().ok_or_else(|| {
            Error::invalid_configuration(format!("Secret '{}' has no string value", self.secret_id))
        })?;

        let values = parse_secret_map(raw).map_err(|e| {
            Error::invalid_configuration(format!("Secret '{}' is not a JSON object: {}", self.secret_id, e))
        })?;

        tracing::info!("Loaded {} values from secret '{}'", values.len(), self.secret_id);
        Ok(values)
    }
}

/// Parse a JSON object into name/value pairs; non-string values keep their JSON text
fn parse_secret_map(raw: &str) -> std::result::Result<HashMap<String, String>, serde_json::Error> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(object
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, value)
        })
        .collect())
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn get(&self, name: &str) -> Result<Option<SecretString>> {
        let values = self.values.get_or_try_init(|| self.fetch()).await?;
        Ok(values.get(name).map(|v| SecretString::new(v.clone())))
    }

    fn name(&self) -> &str {
        "secrets-manager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_secret_map() {
        let map = parse_secret_map(r#"{"QDRANT_URL":"https://q.example:6333","PORT":6333}"#).unwrap();
        assert_eq!(map["QDRANT_URL"], "https://q.example:6333");
        assert_eq!(map["PORT"], "6333");
        assert!(parse_secret_map("[1,2]").is_err());
    }

    #[tokio::test]
    async fn test_static_secrets() {
        let secrets = StaticSecrets::new().with("QDRANT_API_KEY", "k-123");
        let key = secrets.get("QDRANT_API_KEY").await.unwrap().unwrap();
        assert_eq!(key.expose_secret(), "k-123");
        assert!(secrets.get("OTHER").await.unwrap().is_none());
        assert!(NoSecrets.get("QDRANT_API_KEY").await.unwrap().is_none());
    }
}
