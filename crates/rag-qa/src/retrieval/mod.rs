//! Top-k retrieval over a vector index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::VectorIndex;
use crate::types::{sort_by_score, RetrievedChunk};

/// Retrieves the chunks most similar to a question vector
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over `index`
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Return at most `k` chunks, most similar first.
    ///
    /// `k == 0` is rejected before the index is contacted.
    pub async fn retrieve(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Err(Error::invalid_argument("k must be greater than 0"));
        }

        let mut results = self.index.query(collection, vector, k).await?;
        sort_by_score(&mut results);
        results.truncate(k);

        tracing::debug!(
            "Retrieved {} chunks from '{}' via {} (k={})",
            results.len(),
            collection,
            self.index.name(),
            k
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{Chunk, CollectionInfo, IndexedChunk};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Ignores `k` and returns results out of order
    struct LaxIndex {
        queries: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for LaxIndex {
        async fn create(&self, _: &str, _: usize, _: bool) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, _: &str, _: &[IndexedChunk]) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<RetrievedChunk>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok([0.1, 0.9, 0.5, 0.9]
                .iter()
                .enumerate()
                .map(|(i, s)| RetrievedChunk {
                    chunk: Chunk::new(format!("c{}", i), i as u32, "doc"),
                    score: *s,
                })
                .collect())
        }

        async fn describe(&self, collection: &str) -> Result<CollectionInfo> {
            Err(Error::not_found(collection.to_string()))
        }

        async fn delete(&self, _: &str) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "lax"
        }
    }

    #[tokio::test]
    async fn test_truncates_and_orders() {
        let retriever = Retriever::new(Arc::new(LaxIndex { queries: AtomicUsize::new(0) }));
        let results = retriever.retrieve("docs", &[1.0], 3).await.unwrap();

        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["c1", "c3", "c2"]);
    }

    #[tokio::test]
    async fn test_zero_k_rejected_locally() {
        let index = Arc::new(LaxIndex { queries: AtomicUsize::new(0) });
        let retriever = Retriever::new(index.clone());

        let err = retriever.retrieve("docs", &[1.0], 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(index.queries.load(Ordering::SeqCst), 0);
    }
}
