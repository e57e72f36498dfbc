//! chunkserve daemon entry point.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use chunkserve_server::{DownloadServer, ServerConfig, TransferHandler};
use chunkserve_transfer::{TransferConfig, TransferEngine};

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting chunkserve daemon"
    );

    // Load configuration.
    let config = config::Config::load()?;
    tracing::info!(
        storage_root = %config.storage_root,
        port = config.port,
        chunk_size = config.chunk_size,
        "configuration loaded"
    );

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

async fn run(config: config::Config) -> anyhow::Result<()> {
    let storage_root = PathBuf::from(&config.storage_root);
    if !storage_root.is_dir() {
        std::fs::create_dir_all(&storage_root)?;
        tracing::info!(path = %storage_root.display(), "created storage root");
    }

    let engine = Arc::new(TransferEngine::new(TransferConfig {
        storage_root,
        chunk_size: config.chunk_size,
    }));
    let server = DownloadServer::new(
        ServerConfig { port: config.port },
        TransferHandler::new(engine),
    );

    let server2 = Arc::clone(&server);
    let server_task = tokio::spawn(async move { server2.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("ctrl-c received, shutting down");
    server.shutdown();
    server_task.await??;
    Ok(())
}
