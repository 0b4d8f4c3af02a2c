//! AWS SDK backed object store
//!
//! Wraps `aws_sdk_s3::Client` with static credentials taken from
//! [`StoreConfig`]. When a custom endpoint is configured the client switches
//! to path-style addressing so MinIO and RustFS work out of the box.
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | PutObject | `s3.put_object` | bucket, key, bytes |
//! | HeadObject | `s3.head_object` | bucket, key |
//! | DeleteObject | `s3.delete_object` | bucket, key |
//! | ListBuckets | `s3.list_buckets` | bucket count |

use super::{ObjectBody, ObjectStore, StoreError};
use crate::config::StoreConfig;
use crate::metrics;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::Client;

/// Provider name reported by the static credentials
const CREDENTIALS_PROVIDER: &str = "s3-upload-gateway";

/// S3 object store client
///
/// Cheap to share: the inner SDK client is internally reference counted
/// and safe for concurrent use.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from store configuration
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        tracing::info!(
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 client created"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
        })
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn service_error<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Service(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, body),
        fields(s3.bucket = %bucket, s3.key = %key, upload.bytes = body.len()),
        err
    )]
    async fn put(&self, bucket: &str, key: &str, body: ObjectBody) -> Result<(), StoreError> {
        let (stream, len) = match body {
            ObjectBody::Bytes(bytes) => {
                let len = bytes.len() as u64;
                (ByteStream::from(bytes), len)
            }
            ObjectBody::File { file, path, len } => {
                // Path-backed streams can be replayed when the SDK retries
                let stream = ByteStream::read_from()
                    .path(&path)
                    .length(Length::Exact(len))
                    .build()
                    .await
                    .map_err(|e| StoreError::Body(e.to_string()))?;
                drop(file);
                (stream, len)
            }
        };

        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(len as i64)
            .body(stream)
            .send()
            .await;

        metrics::record_store_operation("put", result.is_ok());
        let output = result.map_err(service_error)?;

        tracing::debug!(etag = ?output.e_tag(), "PutObject completed");
        Ok(())
    }

    #[tracing::instrument(
        name = "s3.head_object",
        skip(self),
        fields(s3.bucket = %bucket, s3.key = %key),
        err
    )]
    async fn head(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let result = self.client.head_object().bucket(bucket).key(key).send().await;
        metrics::record_store_operation("head", result.is_ok());

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Err(StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    })
                } else {
                    Err(service_error(e))
                }
            }
        }
    }

    #[tracing::instrument(
        name = "s3.delete_object",
        skip(self),
        fields(s3.bucket = %bucket, s3.key = %key),
        err
    )]
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;
        metrics::record_store_operation("delete", result.is_ok());
        result.map(|_| ()).map_err(service_error)
    }

    #[tracing::instrument(name = "s3.list_buckets", skip(self), err)]
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let result = self.client.list_buckets().send().await;
        metrics::record_store_operation("list_buckets", result.is_ok());
        let output = result.map_err(service_error)?;

        let names: Vec<String> = output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect();

        tracing::debug!(buckets = names.len(), "ListBuckets completed");
        Ok(names)
    }
}
