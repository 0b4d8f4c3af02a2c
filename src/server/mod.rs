//! HTTP server module
//!
//! Accepts connections with `hyper` on top of `tokio`, one task per
//! connection, and dispatches requests to [`handlers`].
//!
//! # Example
//!
//! ```no_run
//! use s3_upload_gateway::config::Config;
//! use s3_upload_gateway::server::{AppState, Server};
//! use s3_upload_gateway::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let state = AppState::new(&config, Arc::new(InMemoryStore::new()));
//! let server = Server::bind(&config.server.address, state).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod handlers;
pub mod multipart;

use crate::config::Config;
use crate::store::ObjectStore;
use crate::upload::{MultiUploader, UploadGateway};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    RuntimeError(String),
}

/// Shared state handed to every request
pub struct AppState {
    pub gateway: Arc<UploadGateway>,
    pub uploader: MultiUploader,
    pub key_prefix: String,
    pub max_memory_bytes: usize,
    pub metrics_enabled: bool,
}

impl AppState {
    /// Wire the gateway and orchestrator over `store`
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        let gateway = Arc::new(UploadGateway::new(config.store.clone(), store));
        let uploader = MultiUploader::new(
            Arc::clone(&gateway),
            config.upload.max_concurrent_uploads,
        );

        Self {
            gateway,
            uploader,
            key_prefix: config.upload.key_prefix.clone(),
            max_memory_bytes: config.server.max_memory_bytes,
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// HTTP server bound to a local address
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind to `address`
    ///
    /// Port 0 lets the OS pick a free port; see [`Server::local_addr`].
    pub async fn bind(address: &str, state: AppState) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state: Arc::new(state),
            listener,
            local_addr,
        })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        let (tx, rx) = tokio::sync::oneshot::channel::<std::io::Error>();
        let shutdown = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                let _ = tx.send(e);
            }
        };

        self.run_until(shutdown).await?;

        match rx.await {
            Ok(e) => Err(ServerError::RuntimeError(e.to_string())),
            Err(_) => Ok(()),
        }
    }

    /// Serve until `shutdown` resolves
    ///
    /// Stops accepting new connections once `shutdown` completes; requests
    /// already in flight run to completion on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                }
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handlers::handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }
    }
}
