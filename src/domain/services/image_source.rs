//! Turns uploaded files and typed URLs into images of a collection.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::aggregates::{CollectionError, ImageCollection, ImageRecord};
use crate::domain::value_objects::ImageUrl;

/// A file picked by staff in the admin form
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: content_type.into(), bytes }
    }

    pub fn extension(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext).filter(|ext| !ext.is_empty())
    }
}

/// Stores image content and hands back its public location.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, file: &UploadFile) -> Result<String, StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{file_name} rejected: {reason}")]
    Rejected { file_name: String, reason: String },
    #[error("blob store returned an empty URL for {0}")]
    EmptyUrl(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of one file of an upload batch
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: Result<ImageRecord, StorageError>,
}

impl UploadOutcome {
    pub fn is_ok(&self) -> bool { self.result.is_ok() }
}

#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<UploadOutcome> for UploadReport {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome.result {
            Ok(image) => Self { file_name: outcome.file_name, image: Some(image), error: None },
            Err(e) => Self { file_name: outcome.file_name, image: None, error: Some(e.to_string()) },
        }
    }
}

pub struct ImageSource<S> {
    store: S,
}

impl<S: BlobStore> ImageSource<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub fn store(&self) -> &S { &self.store }

    /// Uploads the whole batch concurrently and, once every upload has settled, appends
    /// the successful ones in selection order. Failed files are reported and skipped.
    pub async fn upload_batch(&self, collection: &mut ImageCollection, files: &[UploadFile]) -> Vec<UploadOutcome> {
        let stored = join_all(files.iter().map(|file| self.store.store(file))).await;

        let outcomes: Vec<UploadOutcome> = files.iter().zip(stored).map(|(file, result)| {
            let result = result.and_then(|url| {
                ImageUrl::new(url).map_err(|_| StorageError::EmptyUrl(file.file_name.clone()))
            }).map(|url| collection.append(url, Some(file.file_name.clone())).clone());
            if let Err(e) = &result {
                warn!(file = %file.file_name, error = %e, "image upload failed");
            }
            UploadOutcome { file_name: file.file_name.clone(), result }
        }).collect();

        let uploaded = outcomes.iter().filter(|o| o.is_ok()).count();
        info!(parent = ?collection.parent_id(), uploaded, failed = outcomes.len() - uploaded, "upload batch settled");
        outcomes
    }

    pub fn add_url<'c>(&self, collection: &'c mut ImageCollection, raw: &str) -> Result<&'c ImageRecord, CollectionError> {
        collection.add_url(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers after a per-file delay and remembers completion order.
    struct ScriptedStore {
        delays_ms: HashMap<&'static str, u64>,
        failing: Vec<&'static str>,
        completed: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn new(delays_ms: &[(&'static str, u64)], failing: &[&'static str]) -> Self {
            Self { delays_ms: delays_ms.iter().copied().collect(), failing: failing.to_vec(), completed: Mutex::new(vec![]) }
        }
    }

    #[async_trait]
    impl BlobStore for ScriptedStore {
        async fn store(&self, file: &UploadFile) -> Result<String, StorageError> {
            let delay = self.delays_ms.get(file.file_name.as_str()).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completed.lock().unwrap().push(file.file_name.clone());
            if self.failing.iter().any(|f| *f == file.file_name) {
                return Err(StorageError::Rejected { file_name: file.file_name.clone(), reason: "too large".into() });
            }
            Ok(format!("https://cdn.example/{}", file.file_name))
        }
    }

    fn file(name: &str) -> UploadFile { UploadFile::new(name, "image/jpeg", vec![0xFF, 0xD8]) }

    #[tokio::test]
    async fn test_batch_appends_in_selection_order() {
        let source = ImageSource::new(ScriptedStore::new(&[("A", 40), ("B", 80), ("C", 5)], &[]));
        let mut collection = ImageCollection::new(None, "Bolsa Luna");
        let outcomes = source.upload_batch(&mut collection, &[file("A"), file("B"), file("C")]).await;

        assert_eq!(*source.store().completed.lock().unwrap(), vec!["C", "A", "B"]);
        assert!(outcomes.iter().all(UploadOutcome::is_ok));
        let appended: Vec<(u32, bool, &str, &str)> = collection.images().iter()
            .map(|i| (i.order, i.is_primary, i.url.as_str(), i.alt_text.as_str())).collect();
        assert_eq!(appended, vec![
            (0, true, "https://cdn.example/A", "A"),
            (1, false, "https://cdn.example/B", "B"),
            (2, false, "https://cdn.example/C", "C"),
        ]);
    }

    #[tokio::test]
    async fn test_partial_batch_keeps_successes() {
        let source = ImageSource::new(ScriptedStore::new(&[], &["B"]));
        let mut collection = ImageCollection::new(None, "Bolsa Luna");
        collection.add_url("https://x/existing.jpg").unwrap();

        let outcomes = source.upload_batch(&mut collection, &[file("A"), file("B"), file("C")]).await;

        assert!(matches!(outcomes[1].result, Err(StorageError::Rejected { .. })));
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 2);
        let urls: Vec<&str> = collection.images().iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/existing.jpg", "https://cdn.example/A", "https://cdn.example/C"]);
        assert_eq!(collection.images().iter().map(|i| i.order).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(collection.primary().unwrap().url, "https://x/existing.jpg");

        let report = UploadReport::from(outcomes.into_iter().nth(1).unwrap());
        assert_eq!(report.error.as_deref(), Some("B rejected: too large"));
    }

    #[tokio::test]
    async fn test_add_url_through_source() {
        let source = ImageSource::new(ScriptedStore::new(&[], &[]));
        let mut collection = ImageCollection::new(None, "Bolsa Luna");
        assert!(source.add_url(&mut collection, "").is_err());
        assert!(source.add_url(&mut collection, "https://x/1.jpg").unwrap().is_primary);
    }

    #[test]
    fn test_extension() {
        assert_eq!(file("foto.final.png").extension(), Some("png"));
        assert_eq!(file("semext").extension(), None);
    }
}
