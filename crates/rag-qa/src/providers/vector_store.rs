//! Vector index trait for storing and searching chunk embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CollectionInfo, IndexedChunk, RetrievedChunk};

/// Trait for a collection-oriented vector index
///
/// Implementations:
/// - `QdrantIndex`: Qdrant REST API
/// - `MemoryIndex`: in-process index for tests and local runs
///
/// Errors name the collection and operation. Connectivity, auth and server
/// failures are `ServiceUnavailable`, a missing collection is `NotFound`,
/// and a rejected request (e.g. wrong vector dimension) is `InvalidArgument`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a cosine collection if absent.
    ///
    /// With `force_recreate` an existing collection is dropped first;
    /// without it an existing collection is left untouched.
    async fn create(&self, collection: &str, dimensions: usize, force_recreate: bool) -> Result<()>;

    /// Insert or overwrite points keyed by `Chunk::point_id`
    async fn upsert(&self, collection: &str, points: &[IndexedChunk]) -> Result<()>;

    /// Return up to `k` chunks most similar to `vector`, most similar first
    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Collection metadata
    async fn describe(&self, collection: &str) -> Result<CollectionInfo>;

    /// Drop a collection and all its points
    async fn delete(&self, collection: &str) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
