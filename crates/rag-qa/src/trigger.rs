//! Object-storage ingestion trigger
//!
//! Turns an S3 notification event (or a direct invocation naming one object)
//! into ingestion runs and reports the outcome as `{statusCode, body}`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pipeline::{IngestOptions, Pipeline, Stage};
use crate::providers::{DocumentStore, EmbeddingRequest};
use crate::types::CollectionState;

/// S3 notification event
#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// URL-encoded object key
    pub key: String,
}

/// Direct invocation naming one object
#[derive(Debug, Clone, Deserialize)]
pub struct DirectInvocation {
    #[serde(default)]
    pub bucket_name: Option<String>,
    pub object_key: String,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
}

/// Accepted trigger payloads
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TriggerEvent {
    /// Notification from the object store
    S3(S3Event),
    /// Explicit request
    Direct(DirectInvocation),
}

/// Values used when the event does not name them
#[derive(Debug, Clone)]
pub struct TriggerDefaults {
    pub bucket: String,
    pub collection: String,
    pub region: String,
    pub embedding: EmbeddingRequest,
    pub chunk_size: usize,
    pub overlap: usize,
}

/// One object to ingest
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub bucket: String,
    pub key: String,
    pub options: IngestOptions,
}

/// Handler result in the shape object-store notifications expect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

/// Runs ingestion for trigger events
pub struct IngestTrigger {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn DocumentStore>,
    defaults: TriggerDefaults,
}

impl IngestTrigger {
    /// Create a trigger handler
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<dyn DocumentStore>, defaults: TriggerDefaults) -> Self {
        Self {
            pipeline,
            store,
            defaults,
        }
    }

    /// Handle a raw JSON event; never fails, errors become status codes
    pub async fn handle(&self, event: serde_json::Value) -> TriggerResponse {
        match self.process(event).await {
            Ok(states) => {
                for state in &states {
                    tracing::info!(
                        "Ingested '{}' into '{}' ({} chunks, {} points)",
                        state.document,
                        state.collection,
                        state.chunks_upserted,
                        state.info.points_count
                    );
                }
                TriggerResponse {
                    status_code: 200,
                    body: "Successful!".to_string(),
                }
            }
            Err(err) => {
                let kind = err.kind();
                tracing::error!(kind = %kind, "Ingestion trigger failed: {}", err);
                TriggerResponse {
                    status_code: kind.status_code().as_u16(),
                    body: err.to_string(),
                }
            }
        }
    }

    /// Parse and run every job in `event`, stopping at the first failure
    pub async fn process(&self, event: serde_json::Value) -> Result<Vec<CollectionState>> {
        let jobs = self.jobs(event)?;
        let mut states = Vec::with_capacity(jobs.len());
        for job in jobs {
            tracing::info!("Triggered ingestion of s3://{}/{}", job.bucket, job.key);
            let document = self
                .store
                .fetch_in(&job.options.region, &job.bucket, &job.key)
                .await
                .map_err(|e| e.at_stage(Stage::Loading))?;
            states.push(self.pipeline.ingest(&document, &job.options).await?);
        }
        Ok(states)
    }

    /// Turn an event into ingestion jobs
    pub fn jobs(&self, event: serde_json::Value) -> Result<Vec<IngestJob>> {
        let event: TriggerEvent = serde_json::from_value(event)
            .map_err(|e| Error::invalid_argument(format!("Unrecognised trigger event: {}", e)))?;

        match event {
            TriggerEvent::S3(s3) => {
                if s3.records.is_empty() {
                    return Err(Error::invalid_argument("Trigger event has no records"));
                }
                s3.records
                    .into_iter()
                    .map(|record| -> Result<IngestJob> {
                        Ok(IngestJob {
                            bucket: record.s3.bucket.name,
                            key: decode_key(&record.s3.object.key)?,
                            options: self.options(None, None, None)?,
                        })
                    })
                    .collect()
            }
            TriggerEvent::Direct(direct) => Ok(vec![IngestJob {
                bucket: direct.bucket_name.unwrap_or_else(|| self.defaults.bucket.clone()),
                key: direct.object_key,
                options: self.options(direct.collection_name, direct.region, direct.embedding_model.as_deref())?,
            }]),
        }
    }

    fn options(
        &self,
        collection: Option<String>,
        region: Option<String>,
        embedding_model: Option<&str>,
    ) -> Result<IngestOptions> {
        let embedding = match embedding_model {
            Some(model) => EmbeddingRequest::for_model(model)?,
            None => self.defaults.embedding.clone(),
        };
        Ok(IngestOptions {
            collection: collection.unwrap_or_else(|| self.defaults.collection.clone()),
            chunk_size: self.defaults.chunk_size,
            overlap: self.defaults.overlap,
            embedding,
            region: region.unwrap_or_else(|| self.defaults.region.clone()),
            force_recreate: false,
        })
    }
}

/// Decode an S3 notification key (`+` is a space, the rest is percent-encoded)
pub fn decode_key(key: &str) -> Result<String> {
    let spaced = key.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|k| k.into_owned())
        .map_err(|e| Error::invalid_argument(format!("Object key '{}' is not valid UTF-8: {}", key, e)))
}
