//! In-process vector index using brute-force cosine similarity

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{sort_by_score, Chunk, CollectionInfo, CollectionStatus, IndexedChunk, RetrievedChunk};

use super::vector_store::VectorIndex;

struct Collection {
    dimensions: usize,
    /// Ordered by point id so equal scores come back in a stable order
    points: BTreeMap<Uuid, (Chunk, Vec<f32>)>,
}

/// Vector index held in memory; contents are lost on drop
#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn missing(collection: &str, operation: &str) -> Error {
    Error::not_found(format!("{} on collection '{}': collection does not exist", operation, collection))
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn create(&self, collection: &str, dimensions: usize, force_recreate: bool) -> Result<()> {
        if dimensions == 0 {
            return Err(Error::invalid_argument(format!(
                "create on collection '{}': dimensions must be greater than 0",
                collection
            )));
        }

        let mut collections = self.collections.write();
        if force_recreate || !collections.contains_key(collection) {
            collections.insert(
                collection.to_string(),
                Collection {
                    dimensions,
                    points: BTreeMap::new(),
                },
            );
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[IndexedChunk]) -> Result<()> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection, "upsert"))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimensions) {
            return Err(Error::invalid_argument(format!(
                "upsert on collection '{}': expected dimension {}, got {}",
                collection,
                target.dimensions,
                bad.vector.len()
            )));
        }

        for point in points {
            target
                .points
                .insert(point.chunk.point_id(), (point.chunk.clone(), point.vector.clone()));
        }
        Ok(())
    }

    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| missing(collection, "query"))?;

        if vector.len() != target.dimensions {
            return Err(Error::invalid_argument(format!(
                "query on collection '{}': expected dimension {}, got {}",
                collection,
                target.dimensions,
                vector.len()
            )));
        }

        let mut results: Vec<RetrievedChunk> = target
            .points
            .values()
            .map(|(chunk, stored)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(vector, stored),
            })
            .collect();

        sort_by_score(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| missing(collection, "describe"))?;

        let count = target.points.len() as u64;
        Ok(CollectionInfo {
            name: collection.to_string(),
            points_count: count,
            vectors_count: Some(count),
            dimensions: target.dimensions,
            distance: "Cosine".to_string(),
            status: CollectionStatus::Green,
        })
    }

    async fn delete(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| missing(collection, "delete"))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
