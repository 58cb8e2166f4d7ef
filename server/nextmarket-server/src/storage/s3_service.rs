//! S3-compatible blob store for plugin artifacts and icons
//!
//! Talks to MinIO in development and to any S3 endpoint in production. Error
//! text is redacted before it leaves this module because SDK errors can echo
//! signed request parameters.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use logger_redacted::SecretRedactor;
use plugins_registry_api::storage::{
    content_type_for_key, BlobResult, BlobStore, BlobStoreError, StoredObject,
};
use tracing::{debug, info};

use crate::config::StorageSettings;

/// Region that rejects an explicit location constraint
const DEFAULT_REGION: &str = "us-east-1";

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    region: String,
    redactor: SecretRedactor,
}

impl S3BlobStore {
    pub async fn new(settings: &StorageSettings) -> Self {
        info!(
            endpoint = %settings.endpoint,
            region = %settings.region,
            bucket = %settings.bucket,
            "Initializing S3 storage service"
        );

        let credentials = aws_sdk_s3::config::Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "nextmarket-s3",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(settings.region.clone()))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(&settings.endpoint)
            .force_path_style(settings.use_path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            redactor: SecretRedactor::default().with_literal(&settings.secret_key),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_error(&self, action: &str, key: &str, detail: impl std::fmt::Display) -> BlobStoreError {
        BlobStoreError::Backend(
            self.redactor
                .redact(&format!("failed to {action} '{key}': {detail}")),
        )
    }

    /// Create the bucket unless it already exists
    ///
    /// # Errors
    ///
    /// `Backend` when the bucket is missing and cannot be created.
    pub async fn ensure_bucket(&self) -> BlobResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            debug!(bucket = %self.bucket, "Bucket already exists");
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| self.backend_error("create bucket", &self.bucket, DisplayErrorContext(e)))?;
        info!(bucket = %self.bucket, "Bucket created");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> BlobResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| self.backend_error("upload", key, DisplayErrorContext(e)))?;

        debug!(bucket = %self.bucket, key = %key, size, "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Err(BlobStoreError::NotFound(key.to_string()));
                }
                return Err(self.backend_error("download", key, DisplayErrorContext(e)));
            }
        };

        let content_type = output
            .content_type()
            .map_or_else(|| content_type_for_key(key).to_string(), str::to_string);
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| self.backend_error("read", key, e))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject { data, content_type })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.backend_error("delete", key, DisplayErrorContext(e)))?;

        debug!(bucket = %self.bucket, key = %key, "Object deleted");
        Ok(())
    }

    async fn presigned_download_url(&self, key: &str, ttl: Duration) -> BlobResult<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| self.backend_error("presign", key, e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| self.backend_error("presign", key, DisplayErrorContext(e)))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_errors_do_not_leak_secret() {
        let settings = StorageSettings {
            secret_key: "super-secret-value".to_string(),
            ..Default::default()
        };
        let store = S3BlobStore::new(&settings).await;
        let err = store.backend_error(
            "upload",
            "plugins/a/1.0.0/a-1.0.0.tgz",
            "signature mismatch for super-secret-value",
        );
        assert!(!err.to_string().contains("super-secret-value"));
        assert_eq!(store.bucket(), "next-market-plugins");
    }

    #[tokio::test]
    async fn test_presign_is_local() {
        // Presigning signs locally and needs no reachable endpoint
        let store = S3BlobStore::new(&StorageSettings::default()).await;
        let url = store
            .presigned_download_url("plugins/a/1.0.0/a-1.0.0.tgz", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/next-market-plugins/plugins/a/1.0.0/"));
        assert!(url.contains("X-Amz-Expires=60"));
    }
}
