//! Object store module
//!
//! Defines the narrow capability the gateway needs from a remote object
//! store and ships two implementations:
//!
//! - [`S3ObjectStore`] - AWS SDK backed client for S3 and S3-compatible stores
//! - [`InMemoryStore`] - in-process fake for tests and local runs
//!
//! # Example
//!
//! ```no_run
//! use s3_upload_gateway::store::{InMemoryStore, ObjectBody, ObjectStore};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! store
//!     .put("my-bucket", "hello.txt", ObjectBody::from(Bytes::from("Hello, World!")))
//!     .await?;
//! store.head("my-bucket", "hello.txt").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

pub mod memory;
pub mod s3;

pub use memory::InMemoryStore;
pub use s3::S3ObjectStore;

/// Object store errors
///
/// The `Display` text is the store's own error text and is forwarded to
/// HTTP callers verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("NotFound: object '{key}' does not exist in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("{0}")]
    Service(String),

    #[error("Failed to read object body: {0}")]
    Body(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// An opened upload stream handed to [`ObjectStore::put`]
///
/// The store consumes the body; dropping it closes the underlying file.
/// `path` lets a store reopen the file, e.g. to replay it on retry.
#[derive(Debug)]
pub enum ObjectBody {
    Bytes(Bytes),
    File {
        file: tokio::fs::File,
        path: PathBuf,
        len: u64,
    },
}

impl ObjectBody {
    /// Length of the body in bytes
    pub fn len(&self) -> u64 {
        match self {
            ObjectBody::Bytes(bytes) => bytes.len() as u64,
            ObjectBody::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the whole body into memory
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        use tokio::io::AsyncReadExt;

        match self {
            ObjectBody::Bytes(bytes) => Ok(bytes),
            ObjectBody::File { mut file, len, .. } => {
                let mut buffer = Vec::with_capacity(len as usize);
                file.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl From<Bytes> for ObjectBody {
    fn from(bytes: Bytes) -> Self {
        ObjectBody::Bytes(bytes)
    }
}

/// Remote object store capability
///
/// Implementations must be safe to share across tasks; the gateway holds
/// one instance behind an `Arc` for the lifetime of the process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` (PutObject)
    async fn put(&self, bucket: &str, key: &str, body: ObjectBody) -> Result<(), StoreError>;

    /// Check that `key` exists (HeadObject)
    async fn head(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Delete `key` (DeleteObject)
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Liveness probe (ListBuckets); returns the visible bucket names
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_text_is_verbatim() {
        let err = StoreError::Service("AccessDenied: Access Denied".into());
        assert_eq!(err.to_string(), "AccessDenied: Access Denied");
    }

    #[test]
    fn test_not_found_text() {
        let err = StoreError::NotFound {
            bucket: "mybucket".into(),
            key: "test-go/cat.png".into(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("test-go/cat.png"));
    }

    #[tokio::test]
    async fn test_body_into_bytes() {
        let body = ObjectBody::from(Bytes::from("hello"));
        assert_eq!(body.len(), 5);
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from("hello"));
    }
}
