//! Upload gateway
//!
//! Single-file operations against one bucket: upload, existence check,
//! removal, store health, and public URL synthesis.
//!
//! Every store error is passed through unchanged. The gateway does not
//! retry, back off, or translate error text.
//!
//! # Example
//!
//! ```no_run
//! use s3_upload_gateway::config::StoreConfig;
//! use s3_upload_gateway::store::InMemoryStore;
//! use s3_upload_gateway::upload::{UploadGateway, UploadedFile};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = StoreConfig {
//!     region: "us-east-1".into(),
//!     access_key_id: "access".into(),
//!     secret_access_key: "secret".into(),
//!     bucket_name: "mybucket".into(),
//!     endpoint: None,
//! };
//! let gateway = UploadGateway::new(config, Arc::new(InMemoryStore::new()));
//!
//! let file = UploadedFile::from_bytes("cat.png", Bytes::from_static(b"meow"));
//! let result = gateway.upload(&file, "test-go/").await;
//! assert_eq!(result.url, "https://mybucket.s3-us-east-1.amazonaws.com/test-go/cat.png");
//! # }
//! ```

use super::{UploadError, UploadResult, UploadedFile};
use crate::config::StoreConfig;
use crate::metrics;
use crate::store::{ObjectStore, StoreError};
use std::sync::Arc;
use std::time::Instant;

/// Build the object key for an upload
///
/// Plain concatenation: no separator is inserted and nothing is sanitized.
pub fn object_key(prefix: &str, filename: &str) -> String {
    format!("{}{}", prefix, filename)
}

/// Gateway over one bucket of an object store
pub struct UploadGateway {
    config: StoreConfig,
    store: Arc<dyn ObjectStore>,
}

impl UploadGateway {
    pub fn new(config: StoreConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Get the region
    pub fn region(&self) -> &str {
        &self.config.region
    }

    /// Public virtual-hosted-style URL for `key`
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3-{}.amazonaws.com/{}",
            self.config.bucket_name, self.config.region, key
        )
    }

    /// Probe the store by listing buckets
    #[tracing::instrument(name = "gateway.health_check", skip(self), err)]
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.list_buckets().await.map(|_| ())
    }

    /// Upload `file` under `prefix + filename`
    ///
    /// Never returns an error; failures are reported through
    /// [`UploadResult::is_error`]. The opened stream is owned by this call
    /// and released on every path.
    #[tracing::instrument(
        name = "gateway.upload",
        skip(self, file),
        fields(
            s3.bucket = %self.config.bucket_name,
            upload.filename = %file.filename,
            upload.prefix = %prefix,
            upload.bytes = file.size()
        )
    )]
    pub async fn upload(&self, file: &UploadedFile, prefix: &str) -> UploadResult {
        let start_time = Instant::now();

        match self.try_upload(file, prefix).await {
            Ok((key, bytes)) => {
                let duration = start_time.elapsed();
                metrics::record_upload_success(bytes, duration.as_secs_f64());

                let url = self.public_url(&key);
                tracing::info!(
                    key = %key,
                    bytes = bytes,
                    duration_ms = duration.as_millis(),
                    "Upload completed"
                );
                UploadResult::success(key, url)
            }
            Err(e) => {
                let duration = start_time.elapsed();
                metrics::record_upload_failure(duration.as_secs_f64());
                metrics::record_error(match &e {
                    UploadError::Io(_) => "upload_open",
                    UploadError::Store(_) => "upload_store",
                });

                tracing::error!(
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "Upload failed"
                );
                UploadResult::failure(&e)
            }
        }
    }

    async fn try_upload(
        &self,
        file: &UploadedFile,
        prefix: &str,
    ) -> Result<(String, u64), UploadError> {
        let body = file.open().await?;
        let bytes = body.len();
        let key = object_key(prefix, &file.filename);

        self.store.put(self.bucket(), &key, body).await?;
        Ok((key, bytes))
    }

    /// Check that `key` exists in the bucket
    ///
    /// Not-found and transport failures both come back as errors.
    #[tracing::instrument(name = "gateway.file_exists", skip(self), err)]
    pub async fn file_exists(&self, key: &str) -> Result<(), StoreError> {
        self.store.head(self.bucket(), key).await
    }

    /// Delete `key` after confirming it exists
    ///
    /// The existence check and the delete are not atomic. A concurrent
    /// removal between the two leaves the object gone either way.
    #[tracing::instrument(name = "gateway.remove", skip(self), err)]
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.file_exists(key).await?;
        self.store.delete(self.bucket(), key).await
    }
}
