//! Upload module
//!
//! The upload gateway (single-file put / exists / remove against the
//! object store), the multi-file orchestrator that fans uploads out
//! concurrently, and the file sources both of them consume.

use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

pub mod file;
pub mod gateway;
pub mod orchestrator;

pub use file::UploadedFile;
pub use gateway::UploadGateway;
pub use orchestrator::{MultiUploadReport, MultiUploader};

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Outcome of a single-file upload
///
/// On failure `key` and `url` are empty and `error_message` carries the
/// underlying error text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadResult {
    pub is_error: bool,
    pub error_message: String,
    pub key: String,
    pub url: String,
}

impl UploadResult {
    pub fn success(key: String, url: String) -> Self {
        Self {
            is_error: false,
            error_message: String::new(),
            key,
            url,
        }
    }

    pub fn failure(error: &UploadError) -> Self {
        Self {
            is_error: true,
            error_message: error.to_string(),
            key: String::new(),
            url: String::new(),
        }
    }
}
