//! S3 Upload Gateway - multipart upload front end for S3

use clap::Parser;
use s3_upload_gateway::server::{AppState, Server};
use s3_upload_gateway::store::{InMemoryStore, ObjectStore, S3ObjectStore};
use s3_upload_gateway::{config::Config, VERSION};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// S3 Upload Gateway - accepts multipart uploads and forwards them to S3
#[derive(Parser, Debug)]
#[command(name = "s3-upload-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (environment variables when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Keep objects in memory instead of talking to S3
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting S3 Upload Gateway v{}", VERSION);

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let config = Config::from_env()?;
            info!("Loaded configuration from environment");
            config
        }
    };
    info!(store = ?config.store, upload = ?config.upload, "Effective configuration");

    let store: Arc<dyn ObjectStore> = if args.memory_store {
        warn!("Using in-memory object store; uploads are not persisted");
        Arc::new(InMemoryStore::with_bucket(&config.store.bucket_name))
    } else {
        Arc::new(S3ObjectStore::new(&config.store).await?)
    };

    let state = AppState::new(&config, store);

    // Startup probe is informational only
    match state.gateway.health_check().await {
        Ok(()) => info!(bucket = %state.gateway.bucket(), "Object store reachable"),
        Err(e) => warn!(error = %e, "Object store health check failed"),
    }

    // Start server
    let server = Server::bind(&config.server.address, state).await?;
    server.run().await?;

    Ok(())
}
