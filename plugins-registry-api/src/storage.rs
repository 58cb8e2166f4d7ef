use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

pub const ARTIFACT_CONTENT_TYPE: &str = "application/gzip";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Blob store error: {0}")]
    Backend(String),
}

pub type BlobResult<T> = Result<T, BlobStoreError>;

/// Object bytes plus the content type they were stored with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Object storage keyed by deterministic paths
///
/// `put` overwrites whatever is at the key, so re-uploading the same
/// artifact is safe.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> BlobResult<()>;

    async fn get(&self, key: &str) -> BlobResult<StoredObject>;

    async fn delete(&self, key: &str) -> BlobResult<()>;

    async fn presigned_download_url(&self, key: &str, ttl: Duration) -> BlobResult<String>;
}

/// `plugins/{name}/{version}/{name}-{version}.tgz`
pub fn artifact_key(name: &str, version: &str) -> String {
    format!("plugins/{name}/{version}/{name}-{version}.tgz")
}

/// `icons/{name}{ext}`; one icon per package, replaced by later uploads
pub fn icon_key(name: &str, extension: &str) -> String {
    format!("icons/{name}{extension}")
}

/// Content type for an icon by its file extension
pub fn icon_content_type(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        _ => "image/png",
    }
}

/// Content type for any stored key, used when serving objects back
pub fn content_type_for_key(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some("tgz" | "gz") => ARTIFACT_CONTENT_TYPE,
        Some(ext) => icon_content_type(ext),
        None => "application/octet-stream",
    }
}

/// A recorded blob-store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOperation {
    Put(String),
    Get(String),
    Delete(String),
    Presign(String),
}

#[derive(Debug, Default)]
struct FailurePlan {
    put_prefixes: HashSet<String>,
    delete_prefixes: HashSet<String>,
    presign: bool,
}

/// In-memory blob store for development and testing
///
/// Records every call and can be told to fail puts or deletes under a key
/// prefix.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    operations: Arc<RwLock<Vec<BlobOperation>>>,
    failures: Arc<RwLock<FailurePlan>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_puts_under(&self, prefix: &str) {
        self.failures.write().await.put_prefixes.insert(prefix.to_string());
    }

    pub async fn fail_deletes_under(&self, prefix: &str) {
        self.failures
            .write()
            .await
            .delete_prefixes
            .insert(prefix.to_string());
    }

    pub async fn fail_presign(&self) {
        self.failures.write().await.presign = true;
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn operations(&self) -> Vec<BlobOperation> {
        self.operations.read().await.clone()
    }

    /// Keys passed to `delete`, in call order
    pub async fn delete_calls(&self) -> Vec<String> {
        self.operations
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                BlobOperation::Delete(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, operation: BlobOperation) {
        self.operations.write().await.push(operation);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> BlobResult<()> {
        self.record(BlobOperation::Put(key.to_string())).await;
        let failing = self
            .failures
            .read()
            .await
            .put_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if failing {
            return Err(BlobStoreError::Backend(format!("injected put failure for {key}")));
        }

        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        self.record(BlobOperation::Get(key.to_string())).await;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.record(BlobOperation::Delete(key.to_string())).await;
        let failing = self
            .failures
            .read()
            .await
            .delete_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if failing {
            return Err(BlobStoreError::Backend(format!(
                "injected delete failure for {key}"
            )));
        }

        // Deleting an absent key succeeds, as it does on S3
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn presigned_download_url(&self, key: &str, ttl: Duration) -> BlobResult<String> {
        self.record(BlobOperation::Presign(key.to_string())).await;
        if self.failures.read().await.presign {
            return Err(BlobStoreError::Backend("injected presign failure".to_string()));
        }
        if !self.objects.read().await.contains_key(key) {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{key}?expires_in={}", ttl.as_secs()))
    }
}
