//! Multi-file upload orchestrator
//!
//! Fans a batch of files out to [`UploadGateway::upload`], one tokio task
//! per file, and joins them all before returning.
//!
//! - Concurrency is capped by a semaphore shared by every batch that goes
//!   through the same uploader.
//! - Each task returns its own report entry; entries are merged after the
//!   join, so nothing is appended from multiple tasks.
//! - A failing file does not cancel its siblings. A task that panics or is
//!   cancelled still yields a failure entry for its file.
//! - The report is in completion order and carries no input index.

use super::{UploadGateway, UploadedFile};
use crate::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const FAILURE_PREFIX: &str = "Failed to upload file: ";

/// Text placed in the report for a file that failed to upload
pub fn failure_entry(filename: &str) -> String {
    format!("{}{}", FAILURE_PREFIX, filename)
}

/// Unordered batch outcome: one public URL or failure string per file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MultiUploadReport {
    entries: Vec<String>,
}

impl MultiUploadReport {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Concurrent multi-file uploader
pub struct MultiUploader {
    gateway: Arc<UploadGateway>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl MultiUploader {
    /// Create an uploader allowing at most `max_concurrent` uploads in flight
    pub fn new(gateway: Arc<UploadGateway>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            gateway,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Upload every file under `prefix` and collect the outcomes
    #[tracing::instrument(
        name = "orchestrator.upload_all",
        skip(self, files),
        fields(batch.files = files.len(), upload.prefix = %prefix)
    )]
    pub async fn upload_all(&self, files: Vec<UploadedFile>, prefix: &str) -> MultiUploadReport {
        metrics::record_batch(files.len());

        if files.is_empty() {
            return MultiUploadReport::default();
        }

        let mut tasks = JoinSet::new();
        let mut filenames = HashMap::with_capacity(files.len());
        for file in files {
            let gateway = Arc::clone(&self.gateway);
            let permits = Arc::clone(&self.permits);
            let prefix = prefix.to_string();
            let filename = file.filename.clone();

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = permits.acquire_owned().await.ok();

                let result = gateway.upload(&file, &prefix).await;
                if result.is_error {
                    failure_entry(&file.filename)
                } else {
                    result.url
                }
            });
            filenames.insert(handle.id(), filename);
        }

        let mut entries = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, entry)) => entries.push(entry),
                Err(e) => {
                    let filename = filenames.remove(&e.id()).unwrap_or_default();
                    if e.is_panic() {
                        tracing::error!(filename = %filename, "Upload task panicked");
                    } else {
                        tracing::error!(
                            filename = %filename,
                            error = %e,
                            "Upload task did not complete"
                        );
                    }
                    entries.push(failure_entry(&filename));
                }
            }
        }

        let failures = entries
            .iter()
            .filter(|entry| entry.starts_with(FAILURE_PREFIX))
            .count();
        tracing::info!(
            files = entries.len(),
            failures = failures,
            "Batch upload completed"
        );

        MultiUploadReport { entries }
    }
}
