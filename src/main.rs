//! Streaming Gateway Server
//!
//! Entry point for the streamgate HTTP server. Loads configuration, sets
//! up logging, builds the client pool over the directory-backed transport
//! and serves the routes until shutdown.

use std::env;
use std::path::Path;
use std::sync::Arc;
use streamgate::config::GateConfig;
use streamgate::dir_source::DirSource;
use streamgate::pool::ClientPool;
use streamgate::server::{serve, AppState};
use streamgate::transfer::Transport;
use tracing::{error, info, warn};

/// Main entry point for the streamgate server
///
/// # Usage
/// ```bash
/// # Start with default config (streamgate.yaml)
/// cargo run
///
/// # Start with custom config
/// cargo run -- /path/to/config.yaml
/// ```
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamgate=info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting streamgate server");

    // Config file path from command line, falling back to defaults when
    // the default file is absent.
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "streamgate.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from: {}", config_path);
        match GateConfig::from_file(&config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("Config file {} not found, using defaults", config_path);
        GateConfig::default()
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Configuration:");
    info!("  - Bind address: {}", config.bind);
    info!("  - Library root: {}", config.library_root);
    info!("  - Channel id: {}", config.channel_id);
    info!("  - Pool size: {}", config.pool_size);
    info!("  - Hash length: {}", config.hash_length);
    info!(
        "  - Chunk size: {} KiB floor, {} KiB ceiling",
        config.chunk_floor_bytes / 1024,
        config.chunk_ceiling_bytes / 1024
    );

    let transports: Vec<Arc<dyn Transport>> = (0..config.pool_size)
        .map(|_| Arc::new(DirSource::new(&config.library_root)) as _)
        .collect();
    let pool = ClientPool::new(transports)?;
    info!("Client pool ready with {} client(s)", pool.len());

    let state = Arc::new(AppState::new(config, pool));
    serve(state).await
}
