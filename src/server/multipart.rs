//! Multipart form decoding
//!
//! Streams a `multipart/form-data` body through `multer`, spooling each
//! file part with [`FileSpool`]. Plain value fields are kept as strings.

use crate::upload::file::FileSpool;
use crate::upload::UploadedFile;
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::BodyStream;
use hyper::body::Body;
use hyper::header::CONTENT_TYPE;
use hyper::HeaderMap;
use std::collections::HashMap;
use thiserror::Error;

/// Form decoding errors
#[derive(Error, Debug)]
pub enum FormError {
    #[error("request is not multipart/form-data")]
    NotMultipart,

    #[error("malformed multipart body: {0}")]
    Malformed(#[from] multer::Error),

    #[error("form values exceed {limit} bytes")]
    ValuesTooLarge { limit: u64 },

    #[error("failed to buffer upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: Vec<UploadedFile>,
    values: HashMap<String, String>,
}

impl MultipartForm {
    /// Remove and return the first file sent under `field`
    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field_name == field)?;
        Some(self.files.remove(index))
    }

    /// Remove and return every file sent under `field`, in request order
    pub fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field_name == field);
        self.files = rest;
        taken
    }

    /// Value of a non-file field
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Extra in-memory allowance for non-file fields on top of `max_memory`
pub const VALUE_MEMORY_ALLOWANCE: u64 = 10 << 20;

/// Last path segment of a client-supplied filename
///
/// Trailing separators are ignored; a name made only of separators
/// collapses to `/`.
pub fn base_name(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

/// Decode a multipart body
///
/// File parts larger than `max_memory` bytes are spilled to temp files that
/// live as long as the returned [`UploadedFile`]s. Non-file fields share a
/// budget of `max_memory + VALUE_MEMORY_ALLOWANCE` bytes; exceeding it fails
/// the whole form once the rest of the body has been read and discarded.
/// Filenames keep only their last path segment.
pub async fn parse_form<B>(
    headers: &HeaderMap,
    body: B,
    max_memory: usize,
) -> Result<MultipartForm, FormError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(FormError::NotMultipart)?;
    let boundary = multer::parse_boundary(content_type).map_err(|_| FormError::NotMultipart)?;

    let stream = BodyStream::new(body)
        .try_filter_map(|frame| futures::future::ready(Ok(frame.into_data().ok())));
    let mut multipart = multer::Multipart::new(stream, boundary);

    let value_limit = max_memory as u64 + VALUE_MEMORY_ALLOWANCE;
    let mut value_budget = value_limit;
    let mut oversized = false;

    let mut form = MultipartForm::default();
    while let Some(mut field) = multipart.next_field().await? {
        // Once over budget, remaining parts are skipped unread
        if oversized {
            continue;
        }
        let name = field.name().unwrap_or_default().to_string();

        let filename = field.file_name().map(base_name).unwrap_or_default();
        if filename.is_empty() {
            let mut value = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                let len = chunk.len() as u64;
                if len > value_budget {
                    oversized = true;
                    break;
                }
                value_budget -= len;
                value.extend_from_slice(&chunk);
            }
            if oversized {
                continue;
            }
            form.values
                .insert(name, String::from_utf8_lossy(&value).into_owned());
            continue;
        }
        let content_type = field.content_type().map(|m| m.to_string());

        let mut spool = FileSpool::new(max_memory);
        while let Some(chunk) = field.chunk().await? {
            spool.write(&chunk).await?;
        }
        let data = spool.finish().await?;

        let file = UploadedFile::new(name, filename, content_type, data);
        tracing::debug!(
            field = %file.field_name,
            filename = %file.filename,
            bytes = file.size(),
            on_disk = file.is_on_disk(),
            "Received form file"
        );
        form.files.push(file);
    }

    if oversized {
        return Err(FormError::ValuesTooLarge { limit: value_limit });
    }
    Ok(form)
}
