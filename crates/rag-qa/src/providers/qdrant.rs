//! Qdrant vector index over the REST API

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Chunk, CollectionInfo, CollectionStatus, IndexedChunk, RetrievedChunk};

use super::vector_store::VectorIndex;

/// Points sent per upsert request
const UPSERT_BATCH_SIZE: usize = 64;

/// Qdrant REST client
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl QdrantIndex {
    /// Create a new Qdrant client
    ///
    /// # Arguments
    /// * `base_url` - Qdrant endpoint (e.g., "http://localhost:6333")
    /// * `api_key` - Sent as the `api-key` header when present
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::invalid_configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, urlencoding::encode(collection))
    }

    /// Send a request and unwrap Qdrant's `{"result": ...}` envelope
    async fn call<B, R>(&self, method: Method, url: String, body: Option<&B>, context: &str) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| Error::from_http(context, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(context, status, &body));
        }

        let envelope: QdrantResponse<R> = response.json().await.map_err(|e| Error::from_http(context, e))?;
        Ok(envelope.result)
    }

    async fn create_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: dimensions,
                distance: "Cosine",
            },
        };
        let context = format!("Qdrant create on collection '{}'", collection);
        let _: Value = self
            .call(Method::PUT, self.collection_url(collection), Some(&body), &context)
            .await?;

        tracing::info!("Created Qdrant collection '{}' ({} dims, cosine)", collection, dimensions);
        Ok(())
    }
}

#[derive(Deserialize)]
struct QdrantResponse<R> {
    result: R,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Serialize)]
struct PointStruct<'a> {
    id: String,
    vector: &'a [f32],
    payload: Value,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct CollectionDescription {
    #[serde(default)]
    status: String,
    #[serde(default)]
    points_count: Option<u64>,
    #[serde(default)]
    vectors_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: DescribedVectors,
}

#[derive(Deserialize)]
struct DescribedVectors {
    size: usize,
    distance: String,
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn create(&self, collection: &str, dimensions: usize, force_recreate: bool) -> Result<()> {
        if force_recreate {
            match self.delete(collection).await {
                Ok(()) => tracing::info!("Dropped Qdrant collection '{}' for recreation", collection),
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            return self.create_collection(collection, dimensions).await;
        }

        match self.describe(collection).await {
            Ok(info) => {
                if info.dimensions != dimensions {
                    tracing::warn!(
                        "Collection '{}' exists with {} dims, requested {}",
                        collection,
                        info.dimensions,
                        dimensions
                    );
                }
                Ok(())
            }
            Err(Error::NotFound(_)) => self.create_collection(collection, dimensions).await,
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, collection: &str, points: &[IndexedChunk]) -> Result<()> {
        let url = format!("{}/points?wait=true", self.collection_url(collection));
        let context = format!("Qdrant upsert on collection '{}'", collection);

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let body = UpsertPoints {
                points: batch
                    .iter()
                    .map(|p| PointStruct {
                        id: p.chunk.point_id().to_string(),
                        vector: &p.vector,
                        payload: p.chunk.to_payload(),
                    })
                    .collect(),
            };
            let _: Value = self.call(Method::PUT, url.clone(), Some(&body), &context).await?;
            tracing::debug!("Upserted {} points into '{}'", batch.len(), collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let url = format!("{}/points/search", self.collection_url(collection));
        let context = format!("Qdrant query on collection '{}'", collection);
        let body = SearchRequest {
            vector,
            limit: k,
            with_payload: true,
        };

        let points: Vec<ScoredPoint> = self.call(Method::POST, url, Some(&body), &context).await?;

        points
            .into_iter()
            .map(|p| {
                Chunk::from_payload(&p.payload)
                    .map(|chunk| RetrievedChunk { chunk, score: p.score })
                    .ok_or_else(|| {
                        Error::service_unavailable(format!("{}: point payload is missing chunk fields", context))
                    })
            })
            .collect()
    }

    async fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        let context = format!("Qdrant describe on collection '{}'", collection);
        let description: CollectionDescription = self
            .call::<(), _>(Method::GET, self.collection_url(collection), None, &context)
            .await?;

        Ok(CollectionInfo {
            name: collection.to_string(),
            points_count: description.points_count.unwrap_or(0),
            vectors_count: description.vectors_count,
            dimensions: description.config.params.vectors.size,
            distance: description.config.params.vectors.distance,
            status: CollectionStatus::parse(&description.status),
        })
    }

    async fn delete(&self, collection: &str) -> Result<()> {
        let context = format!("Qdrant delete on collection '{}'", collection);
        let deleted: bool = self
            .call::<(), _>(Method::DELETE, self.collection_url(collection), None, &context)
            .await?;

        if deleted {
            Ok(())
        } else {
            Err(Error::from_status(context, StatusCode::NOT_FOUND, "collection does not exist"))
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
