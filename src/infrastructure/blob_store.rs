//! Filesystem-backed image storage served under a public base URL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::services::{BlobStore, StorageError, UploadFile};

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, max_bytes: usize) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self { root: root.into(), public_base_url, max_bytes }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        info!(root = %self.root.display(), "blob directory ready");
        Ok(())
    }

    fn check(&self, file: &UploadFile) -> Result<(), StorageError> {
        let reject = |reason: String| StorageError::Rejected { file_name: file.file_name.clone(), reason };
        if !file.content_type.starts_with("image/") {
            return Err(reject(format!("unsupported content type {}", file.content_type)));
        }
        if file.bytes.is_empty() {
            return Err(reject("file is empty".into()));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(reject(format!("file exceeds {} bytes", self.max_bytes)));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, file: &UploadFile) -> Result<String, StorageError> {
        self.check(file)?;
        let ext: String = file.extension().unwrap_or("bin").chars().filter(char::is_ascii_alphanumeric).collect();
        let name = format!("{}.{}", Uuid::new_v4(), ext.to_lowercase());
        fs::write(self.root.join(&name), &file.bytes).await?;
        debug!(file = %file.file_name, stored_as = %name, bytes = file.bytes.len(), "image stored");
        Ok(format!("{}/{}", self.public_base_url, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf { std::env::temp_dir().join(format!("ricca-blobs-{}", Uuid::new_v4())) }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_public_url() {
        let store = LocalBlobStore::new(temp_root(), "https://cdn.example/uploads/", 1024);
        store.ensure_root().await.unwrap();
        let url = store.store(&UploadFile::new("Frente.JPG", "image/jpeg", vec![1, 2, 3])).await.unwrap();

        assert!(url.starts_with("https://cdn.example/uploads/"));
        assert!(url.ends_with(".jpg"));
        let name = url.rsplit('/').next().unwrap();
        assert_eq!(fs::read(store.root().join(name)).await.unwrap(), vec![1, 2, 3]);
        fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversize() {
        let store = LocalBlobStore::new(temp_root(), "http://localhost/uploads", 2);
        let pdf = store.store(&UploadFile::new("manual.pdf", "application/pdf", vec![1])).await;
        assert!(matches!(pdf, Err(StorageError::Rejected { .. })));
        let big = store.store(&UploadFile::new("big.png", "image/png", vec![0; 3])).await;
        assert!(matches!(big, Err(StorageError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let store = LocalBlobStore::new(temp_root().join("nope"), "http://localhost/uploads", 16);
        let res = store.store(&UploadFile::new("a.png", "image/png", vec![1])).await;
        assert!(matches!(res, Err(StorageError::Io(_))));
    }
}
