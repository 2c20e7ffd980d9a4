//! Document store trait for fetching raw source documents

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Document, FileType};

/// Trait for reading source documents from a container (bucket or directory)
///
/// Implementations:
/// - `S3DocumentStore`: AWS S3 bucket
/// - `LocalDocumentStore`: local directory
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by key
    async fn fetch(&self, container: &str, key: &str) -> Result<Document>;

    /// Fetch one document from a container hosted in `region`.
    ///
    /// Stores without regions ignore it.
    async fn fetch_in(&self, _region: &str, container: &str, key: &str) -> Result<Document> {
        self.fetch(container, key).await
    }

    /// List document keys under `prefix`, sorted
    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<String>>;

    /// Fetch every supported document under `prefix`
    async fn fetch_all(&self, container: &str, prefix: &str) -> Result<Vec<Document>> {
        let keys = self.list(container, prefix).await?;
        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            if !FileType::from_name(&key).is_supported() {
                tracing::debug!("Skipping unsupported document {}", key);
                continue;
            }
            documents.push(self.fetch(container, &key).await?);
        }
        Ok(documents)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Store over fixed keys that records every fetch
    struct CountingStore {
        keys: Vec<&'static str>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn fetch(&self, _container: &str, key: &str) -> Result<Document> {
            self.fetched.lock().push(key.to_string());
            Ok(Document::new(key, b"content".to_vec()))
        }

        async fn list(&self, _container: &str, _prefix: &str) -> Result<Vec<String>> {
            Ok(self.keys.iter().map(|k| k.to_string()).collect())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_fetch_all_skips_unsupported_keys_without_fetching() {
        let store = CountingStore {
            keys: vec!["a.pdf", "diagram.png", "notes.md", "raw.bin", "b.txt"],
            fetched: Mutex::new(Vec::new()),
        };

        let documents = store.fetch_all("bucket", "").await.unwrap();

        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "notes.md", "b.txt"]);
        assert_eq!(*store.fetched.lock(), vec!["a.pdf", "notes.md", "b.txt"]);
    }

    #[tokio::test]
    async fn test_fetch_in_defaults_to_fetch() {
        let store = CountingStore {
            keys: vec![],
            fetched: Mutex::new(Vec::new()),
        };

        let document = store.fetch_in("eu-west-1", "bucket", "a.txt").await.unwrap();

        assert_eq!(document.name, "a.txt");
        assert_eq!(*store.fetched.lock(), vec!["a.txt"]);
    }
}
