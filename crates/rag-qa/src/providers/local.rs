//! Local document store reading source documents from the filesystem

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::Document;

use super::document_store::DocumentStore;

/// Document store over a local directory.
///
/// A container is a subdirectory of `root` (the empty string is `root`
/// itself); keys are `/`-separated paths relative to the container.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        if container.is_empty() {
            self.root.clone()
        } else {
            self.root.join(container)
        }
    }

    fn resolve(&self, container: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if relative.is_absolute() || relative.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(Error::invalid_argument(format!(
                "Document key '{}' must be a relative path inside the container",
                key
            )));
        }
        Ok(self.container_dir(container).join(relative))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn fetch(&self, container: &str, key: &str) -> Result<Document> {
        let path = self.resolve(container, key)?;
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(format!("Document '{}' not found in {}", key, path.display()))
            } else {
                Error::service_unavailable_with(format!("Failed to read {}", path.display()), e)
            }
        })?;

        tracing::debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(Document::new(key, data))
    }

    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<String>> {
        let dir = self.container_dir(container);
        if !dir.is_dir() {
            return Err(Error::not_found(format!("Document directory {} does not exist", dir.display())));
        }

        let prefix = prefix.to_string();
        let keys = tokio::task::spawn_blocking(move || {
            let mut keys: Vec<String> = WalkDir::new(&dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    let relative = e.path().strip_prefix(&dir).ok()?;
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    key.starts_with(&prefix).then_some(key)
                })
                .collect();
            keys.sort();
            keys
        })
        .await
        .map_err(|e| Error::service_unavailable(format!("Directory listing aborted: {}", e)))?;

        Ok(keys)
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::FileType;

    #[tokio::test]
    async fn test_list_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("aws/nested")).unwrap();
        std::fs::write(dir.path().join("aws/intro.txt"), "AWS is a cloud platform.").unwrap();
        std::fs::write(dir.path().join("aws/nested/more.md"), "# More").unwrap();
        std::fs::write(dir.path().join("aws/logo.png"), [0u8, 1]).unwrap();

        let store = LocalDocumentStore::new(dir.path());
        let keys = store.list("aws", "").await.unwrap();
        assert_eq!(keys, vec!["intro.txt", "logo.png", "nested/more.md"]);

        let doc = store.fetch("aws", "intro.txt").await.unwrap();
        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(&doc.data[..], b"AWS is a cloud platform.");

        let supported = store.fetch_all("aws", "").await.unwrap();
        assert_eq!(supported.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path());

        let err = store.fetch("", "absent.pdf").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store.list("missing", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_key_cannot_escape_container() {
        let store = LocalDocumentStore::new("/tmp");
        let err = store.fetch("docs", "../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
