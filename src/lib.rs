//! S3 Upload Gateway Library
//!
//! HTTP front end that accepts `multipart/form-data` uploads and forwards
//! them to an S3 bucket.
//!
//! # Features
//!
//! - **Single Upload**: put, verify and remove one file
//! - **Batch Upload**: bounded concurrent fan-out with per-file outcomes
//! - **S3 Compatible**: AWS S3, MinIO, RustFS via a custom endpoint
//! - **Pluggable Store**: in-memory store for tests and local runs
//!
//! # Example
//!
//! ```no_run
//! use s3_upload_gateway::{config::Config, server::{AppState, Server}};
//! use s3_upload_gateway::store::S3ObjectStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = S3ObjectStore::new(&config.store).await?;
//!     let state = AppState::new(&config, Arc::new(store));
//!     let server = Server::bind(&config.server.address, state).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod router;
pub mod server;
pub mod store;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
