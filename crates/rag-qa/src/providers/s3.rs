//! S3 document store

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::types::Document;

use super::document_store::DocumentStore;

/// Document store reading objects from S3 buckets.
///
/// Holds one SDK client per region; `fetch` and `list` use the default
/// region, `fetch_in` the region of the bucket named by the caller.
pub struct S3DocumentStore {
    default_region: String,
    clients: DashMap<String, aws_sdk_s3::Client>,
}

impl S3DocumentStore {
    /// Wrap an existing S3 client for `region`
    pub fn new(region: impl Into<String>, client: aws_sdk_s3::Client) -> Self {
        let default_region = region.into();
        let clients = DashMap::new();
        clients.insert(default_region.clone(), client);
        Self {
            default_region,
            clients,
        }
    }

    /// Create a client for `region` using the default credential chain
    pub async fn for_region(region: &str) -> Self {
        let config = super::load_aws_config(region).await;
        Self::new(region, aws_sdk_s3::Client::new(&config))
    }

    async fn client_for(&self, region: &str) -> aws_sdk_s3::Client {
        if let Some(client) = self.clients.get(region) {
            return client.clone();
        }

        let config = super::load_aws_config(region).await;
        let client = aws_sdk_s3::Client::new(&config);
        tracing::info!("S3 client initialised for {}", region);

        self.clients
            .entry(region.to_string())
            .or_insert(client)
            .clone()
    }

    async fn get_object(&self, client: &aws_sdk_s3::Client, container: &str, key: &str) -> Result<Document> {
        let output = client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(format!("Object s3://{}/{}", container, key), e, |se| {
                    se.is_no_such_key()
                })
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::service_unavailable_with(format!("Reading s3://{}/{}", container, key), e))?
            .into_bytes();

        tracing::info!("Fetched s3://{}/{} ({} bytes)", container, key, data.len());
        Ok(Document::new(key, data))
    }
}

/// Map an SDK failure: missing bucket/key or a 404 is `NotFound`, anything
/// else (credentials, throttling, network) is `ServiceUnavailable`.
fn map_sdk_error<E, R>(context: String, err: SdkError<E, R>, is_missing: impl Fn(&E) -> bool) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service) = &err {
        if is_missing(service.err()) {
            return Error::not_found(context);
        }
    }
    let message = format!("{}: {}", context, DisplayErrorContext(&err));
    Error::service_unavailable_with(message, err)
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn fetch(&self, container: &str, key: &str) -> Result<Document> {
        self.fetch_in(&self.default_region, container, key).await
    }

    async fn fetch_in(&self, region: &str, container: &str, key: &str) -> Result<Document> {
        tracing::debug!("Fetching s3://{}/{} ({})", container, key, region);
        let client = self.client_for(region).await;
        self.get_object(&client, container, key).await
    }

    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<String>> {
        let client = self.client_for(&self.default_region).await;
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = client.list_objects_v2().bucket(container);
            if !prefix.is_empty() {
                request = request.prefix(prefix);
            }
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let page = request.send().await.map_err(|e| {
                map_sdk_error(format!("Bucket s3://{}", container), e, |se| se.is_no_such_bucket())
            })?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "s3"
    }
}
