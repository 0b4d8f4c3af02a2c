//! Uploaded file sources
//!
//! A multipart file part is held in memory while small and spilled to a
//! temporary file once it crosses the configured threshold.
//!
//! # Example
//!
//! ```no_run
//! use s3_upload_gateway::upload::file::UploadedFile;
//! use bytes::Bytes;
//!
//! # async fn example() -> std::io::Result<()> {
//! let file = UploadedFile::from_bytes("cat.png", Bytes::from_static(b"\x89PNG"));
//! let body = file.open().await?;
//! assert_eq!(body.len(), 4);
//! # Ok(())
//! # }
//! ```

use crate::store::ObjectBody;
use bytes::{Bytes, BytesMut};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Temporary file that is removed when dropped
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Create an empty temp file and return it opened for writing
    pub async fn create() -> io::Result<(Self, tokio::fs::File)> {
        let file_name = format!("upload-gateway-{}.tmp", uuid::Uuid::new_v4());
        let path = std::env::temp_dir().join(file_name);
        let file = tokio::fs::File::create(&path).await?;
        Ok((Self { path }, file))
    }

    /// Get the path to the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up temp file"
                );
            }
        }
    }
}

/// Where the bytes of an uploaded file live
#[derive(Debug)]
pub enum FileData {
    Memory(Bytes),
    Disk { temp: TempFile, len: u64 },
}

/// One file received from a multipart request
#[derive(Debug)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: String,
    pub content_type: Option<String>,
    data: FileData,
}

impl UploadedFile {
    pub fn new(
        field_name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: FileData,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            filename: filename.into(),
            content_type,
            data,
        }
    }

    /// In-memory file with no field name or content type
    pub fn from_bytes(filename: impl Into<String>, bytes: Bytes) -> Self {
        Self::new("", filename, None, FileData::Memory(bytes))
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        match &self.data {
            FileData::Memory(bytes) => bytes.len() as u64,
            FileData::Disk { len, .. } => *len,
        }
    }

    /// Whether the contents were spilled to disk
    pub fn is_on_disk(&self) -> bool {
        matches!(self.data, FileData::Disk { .. })
    }

    /// Path of the spilled temp file, if any
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.data {
            FileData::Memory(_) => None,
            FileData::Disk { temp, .. } => Some(temp.path()),
        }
    }

    /// Open a fresh stream over the file contents
    ///
    /// Fails only for spilled files whose temp file can no longer be opened.
    pub async fn open(&self) -> io::Result<ObjectBody> {
        match &self.data {
            FileData::Memory(bytes) => Ok(ObjectBody::Bytes(bytes.clone())),
            FileData::Disk { temp, len } => {
                let file = tokio::fs::File::open(temp.path()).await?;
                Ok(ObjectBody::File {
                    file,
                    path: temp.path().to_path_buf(),
                    len: *len,
                })
            }
        }
    }
}

/// Accumulates the chunks of one multipart part
///
/// Keeps data in memory up to `threshold` bytes, then moves everything to a
/// [`TempFile`] and keeps appending there.
pub struct FileSpool {
    threshold: usize,
    buffer: BytesMut,
    disk: Option<(TempFile, tokio::fs::File)>,
    len: u64,
}

impl FileSpool {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            buffer: BytesMut::new(),
            disk: None,
            len: 0,
        }
    }

    /// Append a chunk
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.len += chunk.len() as u64;

        if let Some((_, file)) = self.disk.as_mut() {
            return file.write_all(chunk).await;
        }

        if self.buffer.len() + chunk.len() <= self.threshold {
            self.buffer.extend_from_slice(chunk);
            return Ok(());
        }

        let (temp, mut file) = TempFile::create().await?;
        file.write_all(&self.buffer).await?;
        file.write_all(chunk).await?;
        self.buffer = BytesMut::new();

        tracing::debug!(
            path = %temp.path().display(),
            bytes = self.len,
            "Spilled upload to temp file"
        );

        self.disk = Some((temp, file));
        Ok(())
    }

    /// Finish writing and hand back the stored data
    pub async fn finish(self) -> io::Result<FileData> {
        match self.disk {
            Some((temp, mut file)) => {
                file.flush().await?;
                file.sync_all().await?;
                Ok(FileData::Disk {
                    temp,
                    len: self.len,
                })
            }
            None => Ok(FileData::Memory(self.buffer.freeze())),
        }
    }
}
